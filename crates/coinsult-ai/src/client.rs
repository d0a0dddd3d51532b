//! Shared language-model handle

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::{
    error::{Error, Result},
    providers::{
        LlmProvider,
        gigachat::{self, GigaChatProvider},
        openai::OpenAIProvider,
    },
    stream::collect_text,
    types::{ChatMessage, ModelConfig, Provider},
};

/// Text generation from an ordered list of chat messages.
///
/// This is the only language-model operation the agent needs.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Everything needed to construct a provider
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub model: ModelConfig,
    /// Credential for the provider. For GigaChat this is the authorization key.
    pub api_key: Option<String>,
    /// GigaChat OAuth scope
    pub scope: String,
    /// Verify TLS certificates (GigaChat only)
    pub verify_ssl: bool,
}

impl ClientSettings {
    pub fn new(model: ModelConfig) -> Self {
        Self {
            model,
            api_key: None,
            scope: gigachat::DEFAULT_SCOPE.to_string(),
            verify_ssl: true,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Lazily-constructed, explicitly-closable language-model client.
///
/// The provider is built on the first [`ChatModel::generate`] call and reused
/// for every call after that. Missing credentials surface there as
/// [`Error::InvalidApiKey`].
pub struct LlmClient {
    settings: ClientSettings,
    provider: OnceCell<Arc<dyn LlmProvider>>,
    closed: AtomicBool,
}

impl LlmClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            provider: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a client around an already-built provider
    pub fn with_provider(model: ModelConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            settings: ClientSettings::new(model),
            provider: OnceCell::new_with(Some(provider)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn model(&self) -> &ModelConfig {
        &self.settings.model
    }

    /// Release the handle. Later calls fail with [`Error::Closed`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(provider = self.settings.model.provider.name(), "llm client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn provider(&self) -> Result<&Arc<dyn LlmProvider>> {
        self.provider
            .get_or_try_init(|| async { build_provider(&self.settings) })
            .await
    }
}

fn build_provider(settings: &ClientSettings) -> Result<Arc<dyn LlmProvider>> {
    let provider = settings.model.provider;
    tracing::debug!(provider = provider.name(), model = %settings.model.id, "initializing llm provider");

    let key = settings
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let built: Arc<dyn LlmProvider> = match (provider, key) {
        (Provider::GigaChat, Some(key)) => Arc::new(GigaChatProvider::new(
            key,
            settings.scope.clone(),
            settings.verify_ssl,
        )?),
        (Provider::OpenAI | Provider::OpenRouter, Some(key)) => Arc::new(OpenAIProvider::new(key)),
        (Provider::Ollama | Provider::Custom, Some(key)) => Arc::new(OpenAIProvider::new(key)),
        (Provider::Ollama | Provider::Custom, None) => Arc::new(OpenAIProvider::without_key()),
        (_, None) => return Err(Error::InvalidApiKey),
    };
    Ok(built)
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let provider = self.provider().await?;
        let stream = provider.stream(&self.settings.model, messages).await?;
        collect_text(stream).await
    }
}
