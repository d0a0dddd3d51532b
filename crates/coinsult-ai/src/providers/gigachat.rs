//! GigaChat provider
//!
//! GigaChat takes a long-lived authorization key and trades it for a short-lived
//! access token; completions then go through the OpenAI-compatible endpoint.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{LlmProvider, openai::stream_completion};
use crate::{
    error::{Error, Result},
    stream::MessageEventStream,
    types::{ChatMessage, ModelConfig},
};

const AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_B2B";

/// Tokens are refreshed this many seconds before they expire
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// GigaChat API client
pub struct GigaChatProvider {
    client: reqwest::Client,
    credentials: String,
    scope: String,
    auth_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl GigaChatProvider {
    /// Create a provider from an authorization key.
    ///
    /// `verify_ssl = false` accepts the self-signed certificates GigaChat ships with.
    pub fn new(
        credentials: impl Into<String>,
        scope: impl Into<String>,
        verify_ssl: bool,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;
        Ok(Self {
            client,
            credentials: credentials.into(),
            scope: scope.into(),
            auth_url: AUTH_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Override the OAuth endpoint
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Return a cached access token or fetch a new one
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        tracing::debug!(scope = %self.scope, "requesting GigaChat access token");

        let response = self
            .client
            .post(&self.auth_url)
            .header("Authorization", format!("Basic {}", self.credentials))
            .header("RqUID", uuid::Uuid::new_v4().to_string())
            .header("Accept", "application/json")
            .form(&[("scope", self.scope.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("token exchange failed ({}): {}", status, text)));
        }

        let body: TokenResponse = response.json().await?;
        body.into_access_token()
    }
}

#[async_trait]
impl LlmProvider for GigaChatProvider {
    async fn stream(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
    ) -> Result<MessageEventStream> {
        let token = self.access_token().await?;
        stream_completion(&self.client, model, messages, Some(&token))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Expiry as unix milliseconds
    expires_at: i64,
}

impl TokenResponse {
    fn into_access_token(self) -> Result<AccessToken> {
        let expires_at = Utc
            .timestamp_millis_opt(self.expires_at)
            .single()
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("invalid token expiry: {}", self.expires_at))
            })?;
        Ok(AccessToken {
            value: self.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness_margin() {
        let now = Utc::now();
        let fresh = AccessToken {
            value: "t".into(),
            expires_at: now + chrono::Duration::minutes(30),
        };
        let stale = AccessToken {
            value: "t".into(),
            expires_at: now + chrono::Duration::seconds(30),
        };
        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
    }

    #[test]
    fn test_token_response_parsing() {
        let body: TokenResponse = serde_json::from_str(
            r#"{"access_token":"eyJhbGci","expires_at":1735689600000}"#,
        )
        .unwrap();
        let token = body.into_access_token().unwrap();
        assert_eq!(token.value, "eyJhbGci");
        assert_eq!(token.expires_at.timestamp(), 1_735_689_600);
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let provider = GigaChatProvider::new("creds", DEFAULT_SCOPE, true)
            .unwrap()
            .with_auth_url("http://127.0.0.1:1/unreachable");
        *provider.token.lock().await = Some(AccessToken {
            value: "cached".into(),
            expires_at: Utc::now() + chrono::Duration::minutes(10),
        });

        // A fresh cached token never touches the (unreachable) auth endpoint.
        assert_eq!(provider.access_token().await.unwrap(), "cached");
    }
}
