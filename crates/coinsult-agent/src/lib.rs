//! coinsult-agent: intent-driven crypto consultant
//!
//! This crate provides the execution graph that classifies a question, fetches
//! market data, news or web results, and asks the language model for an
//! answer, with per-thread memory so follow-up questions keep their coin.

pub mod classifier;
pub mod error;
pub mod events;
pub mod format;
pub mod graph;
pub mod memory;
pub mod nodes;
pub mod routing;
pub mod service;
pub mod sources;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result, SourceError};
pub use events::GraphEvent;
pub use graph::{Graph, GraphConfig, Node};
pub use memory::MemoryStore;
pub use service::{ChatRequest, ChatResponse, ChatService, ServiceConfig};
pub use sources::{
    MarketData, NewsEntry, NewsSource, PriceQuote, PriceSource, SearchHit, SearchSource, Sources,
};
pub use state::{ApiData, ConversationState, Intent, StateUpdate};
