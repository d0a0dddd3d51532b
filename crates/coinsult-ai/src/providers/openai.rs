//! OpenAI-compatible Chat Completions provider
//!
//! Also serves OpenRouter, Ollama and any custom endpoint that speaks the same
//! streaming protocol. GigaChat reuses [`stream_completion`] after its own token
//! exchange.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use serde::{Deserialize, Serialize};

use super::LlmProvider;
use crate::{
    error::{Error, Result},
    stream::{MessageEvent, MessageEventStream},
    types::{ChatMessage, ModelConfig, StopReason, Usage},
};

/// OpenAI-compatible API client
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAIProvider {
    /// Create a new provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key.into()),
        }
    }

    /// Create a provider for a local endpoint that takes no credential
    pub fn without_key() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn stream(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
    ) -> Result<MessageEventStream> {
        stream_completion(&self.client, model, messages, self.api_key.as_deref())
    }
}

/// Open a streaming chat completion against `{base_url}/chat/completions`.
pub fn stream_completion(
    client: &reqwest::Client,
    model: &ModelConfig,
    messages: &[ChatMessage],
    bearer: Option<&str>,
) -> Result<MessageEventStream> {
    if model.base_url.trim().is_empty() {
        return Err(Error::InvalidConfig(format!(
            "no base URL configured for {}",
            model.provider.name()
        )));
    }

    let request = build_request(model, messages);
    let url = format!("{}/chat/completions", model.base_url.trim_end_matches('/'));

    let mut request_builder = client
        .post(&url)
        .header("content-type", "application/json")
        .json(&request);
    if let Some(token) = bearer {
        request_builder = request_builder.bearer_auth(token);
    }

    let event_source = request_builder
        .eventsource()
        .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

    Ok(Box::pin(create_stream(event_source, model.id.clone())))
}

fn build_request(model: &ModelConfig, messages: &[ChatMessage]) -> ChatRequest {
    ChatRequest {
        model: model.id.clone(),
        messages: messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect(),
        stream: true,
        max_tokens: model.max_tokens,
        temperature: model.temperature,
    }
}

fn parse_chunk(data: &str) -> std::result::Result<StreamChunk, serde_json::Error> {
    serde_json::from_str(data)
}

fn map_finish_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::Length,
        Some("blacklist") | Some("content_filter") => StopReason::Blacklist,
        _ => StopReason::Stop,
    }
}

fn create_stream(
    mut event_source: EventSource,
    model_id: String,
) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut accumulated_text = String::new();
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        yield MessageEvent::Start { model: model_id };

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data == "[DONE]" {
                        break;
                    }

                    match parse_chunk(&msg.data) {
                        Ok(chunk) => {
                            for choice in &chunk.choices {
                                if let Some(ref content) = choice.delta.content {
                                    if !content.is_empty() {
                                        accumulated_text.push_str(content);
                                        yield MessageEvent::TextDelta { delta: content.clone() };
                                    }
                                }
                                if let Some(ref reason) = choice.finish_reason {
                                    finish_reason = Some(reason.clone());
                                }
                            }

                            if let Some(ref stream_usage) = chunk.usage {
                                usage.input = stream_usage.prompt_tokens;
                                usage.output = stream_usage.completion_tokens;
                            }
                        }
                        Err(e) => {
                            event_source.close();
                            yield MessageEvent::Error {
                                message: format!("Failed to parse chunk: {}", e),
                                status: None,
                            };
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    event_source.close();
                    let body = response.text().await.unwrap_or_default();
                    yield MessageEvent::Error {
                        message: format!("HTTP {}: {}", status, body),
                        status: Some(status.as_u16()),
                    };
                    return;
                }
                Err(e) => {
                    event_source.close();
                    yield MessageEvent::Error {
                        message: format!("SSE error: {}", e),
                        status: None,
                    };
                    return;
                }
            }
        }

        event_source.close();

        yield MessageEvent::Done {
            text: accumulated_text,
            stop_reason: map_finish_reason(finish_reason.as_deref()),
            usage,
        };
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

// Streaming response types

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<StreamUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
