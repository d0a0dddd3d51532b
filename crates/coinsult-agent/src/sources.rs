//! External data source traits and their result types

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Spot price snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub name: String,
    pub symbol: String,
    pub price_usd: Option<f64>,
    pub price_change_24h_pct: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub total_volume_usd: Option<f64>,
}

/// Extended market data used for analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub name: String,
    pub symbol: String,
    pub price_usd: Option<f64>,
    pub price_change_24h_pct: Option<f64>,
    pub price_change_7d_pct: Option<f64>,
    pub price_change_30d_pct: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub total_volume_usd: Option<f64>,
    pub ath_usd: Option<f64>,
    pub ath_change_pct: Option<f64>,
}

/// One news result. Serializes flat, so a placeholder renders as `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NewsEntry {
    Article {
        title: String,
        description: String,
        url: String,
        published_at: String,
        source: String,
    },
    Unavailable {
        error: String,
    },
}

impl NewsEntry {
    pub fn unavailable(error: impl Into<String>) -> Self {
        NewsEntry::Unavailable {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
    pub url: String,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current price for a coin id or ticker
    async fn price(&self, coin: &str) -> Result<PriceQuote, SourceError>;

    /// Extended market data for a coin id or ticker
    async fn market_data(&self, coin: &str) -> Result<MarketData, SourceError>;
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Most recent articles for a query.
    ///
    /// Returns a single [`NewsEntry::Unavailable`] when no credential is configured.
    async fn news(&self, query: &str, max_results: usize) -> Result<Vec<NewsEntry>, SourceError>;
}

#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SourceError>;
}

/// The adapters one graph run can call
#[derive(Clone)]
pub struct Sources {
    pub prices: Arc<dyn PriceSource>,
    pub news: Arc<dyn NewsSource>,
    pub search: Arc<dyn SearchSource>,
}

impl Sources {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        news: Arc<dyn NewsSource>,
        search: Arc<dyn SearchSource>,
    ) -> Self {
        Self {
            prices,
            news,
            search,
        }
    }
}
