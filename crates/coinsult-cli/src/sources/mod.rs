//! HTTP adapters for the agent's data sources

pub mod coingecko;
pub mod duckduckgo;
pub mod newsapi;

use std::sync::Arc;
use std::time::Duration;

use coinsult_agent::{SourceError, Sources};
use reqwest::{Client, Response};

pub use coingecko::CoinGecko;
pub use duckduckgo::DuckDuckGo;
pub use newsapi::NewsApi;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_DETAIL_CHARS: usize = 200;

/// Shared HTTP client for all adapters
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("coinsult/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Build the default adapters
pub fn build(news_api_key: Option<String>) -> anyhow::Result<Sources> {
    let client = http_client()?;
    Ok(Sources::new(
        Arc::new(CoinGecko::new(client.clone())),
        Arc::new(NewsApi::new(client.clone(), news_api_key)),
        Arc::new(DuckDuckGo::new(client)),
    ))
}

pub(crate) fn http_error(error: reqwest::Error) -> SourceError {
    if error.is_timeout() {
        SourceError::Http(format!("request timed out: {error}"))
    } else {
        SourceError::Http(error.to_string())
    }
}

/// Turn a non-success response into a [`SourceError::Status`]
pub(crate) async fn status_error(service: &'static str, response: Response) -> SourceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    SourceError::Status {
        service,
        status,
        detail: crate::utils::truncate_chars(body.trim(), MAX_DETAIL_CHARS),
    }
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, SourceError> {
    let body = response.text().await.map_err(http_error)?;
    serde_json::from_str(&body).map_err(|e| SourceError::InvalidResponse(e.to_string()))
}
