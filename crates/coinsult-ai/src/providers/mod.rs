//! Chat-completion provider implementations

pub mod gigachat;
pub mod openai;

use crate::{ChatMessage, MessageEventStream, ModelConfig, Result};
use async_trait::async_trait;

/// Trait for chat-completion providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream a response for the given conversation
    async fn stream(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
    ) -> Result<MessageEventStream>;
}
