//! coinsult-ai: chat-completion client layer
//!
//! This crate provides the single language-model handle shared by every step of
//! the coinsult agent: role-tagged messages in, generated text out. Providers
//! speak the OpenAI-compatible streaming protocol; GigaChat adds an OAuth token
//! exchange in front of it.

pub mod client;
pub mod error;
pub mod providers;
pub mod stream;
pub mod types;

pub use client::{ChatModel, LlmClient};
pub use error::{Error, Result};
pub use stream::MessageEventStream;
pub use types::*;
