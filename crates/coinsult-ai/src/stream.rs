//! Streaming event types and utilities

use crate::error::{Error, Result};
use crate::types::{StopReason, Usage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted during message streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Response started
    Start { model: String },
    /// Text content delta
    TextDelta { delta: String },
    /// Message completed successfully
    Done {
        text: String,
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Error occurred. `status` is set when the endpoint rejected the request.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

/// Drain a stream into the final response text.
///
/// Falls back to the accumulated deltas when the stream ends without a `Done`.
pub async fn collect_text(mut stream: MessageEventStream) -> Result<String> {
    let mut accumulated = String::new();

    while let Some(event) = stream.next().await {
        match event {
            MessageEvent::Start { .. } => {}
            MessageEvent::TextDelta { delta } => accumulated.push_str(&delta),
            MessageEvent::Done { text, usage, .. } => {
                tracing::debug!(input = usage.input, output = usage.output, "completion done");
                return Ok(text);
            }
            MessageEvent::Error {
                message,
                status: Some(status),
            } => return Err(Error::from_status(status, message)),
            MessageEvent::Error {
                message,
                status: None,
            } => return Err(Error::Sse(message)),
        }
    }

    if accumulated.is_empty() {
        return Err(Error::UnexpectedResponse(
            "stream ended without content".to_string(),
        ));
    }
    Ok(accumulated)
}
