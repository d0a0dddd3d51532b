//! Scripted model and in-memory sources for tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coinsult_ai::{ChatMessage, ChatModel};
use parking_lot::Mutex;
use tokio::sync::Barrier;

use crate::{
    error::SourceError,
    sources::{MarketData, NewsEntry, NewsSource, PriceQuote, PriceSource, SearchHit, SearchSource, Sources},
};

/// Model that replays queued answers and records every prompt it receives
#[derive(Default)]
pub struct MockModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Option<Duration>,
}

impl MockModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.replies.lock().push_back(Err(message.into()));
    }

    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().clone()
    }

    /// Text of the last user message of every call
    pub fn user_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter_map(|p| p.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn generate(&self, messages: &[ChatMessage]) -> coinsult_ai::Result<String> {
        self.prompts.lock().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(coinsult_ai::Error::Sse(message)),
            None => Err(coinsult_ai::Error::UnexpectedResponse(
                "no scripted reply left".into(),
            )),
        }
    }
}

/// One struct behind all three source traits
#[derive(Default)]
pub struct MockSources {
    pub quote: Option<PriceQuote>,
    pub market: Option<MarketData>,
    pub articles: Vec<NewsEntry>,
    pub hits: Vec<SearchHit>,
    pub fail_price: bool,
    pub fail_market: bool,
    pub fail_news: bool,
    pub fail_search: bool,
    /// Market and news fetches both wait here when set
    pub barrier: Option<Arc<Barrier>>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl MockSources {
    pub fn into_sources(self) -> (Arc<Self>, Sources) {
        let mock = Arc::new(self);
        let sources = Sources::new(mock.clone(), mock.clone(), mock.clone());
        (mock, sources)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    async fn rendezvous(&self) {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
    }
}

fn outage(service: &'static str) -> SourceError {
    SourceError::Status {
        service,
        status: 503,
        detail: "service unavailable".into(),
    }
}

#[async_trait]
impl PriceSource for MockSources {
    async fn price(&self, coin: &str) -> Result<PriceQuote, SourceError> {
        self.record(format!("price:{coin}"));
        if self.fail_price {
            return Err(outage("coingecko"));
        }
        self.quote
            .clone()
            .ok_or_else(|| SourceError::NotFound(coin.to_string()))
    }

    async fn market_data(&self, coin: &str) -> Result<MarketData, SourceError> {
        self.record(format!("market:{coin}"));
        self.rendezvous().await;
        if self.fail_market {
            return Err(outage("coingecko"));
        }
        self.market
            .clone()
            .ok_or_else(|| SourceError::NotFound(coin.to_string()))
    }
}

#[async_trait]
impl NewsSource for MockSources {
    async fn news(&self, query: &str, max_results: usize) -> Result<Vec<NewsEntry>, SourceError> {
        self.record(format!("news:{query}:{max_results}"));
        self.rendezvous().await;
        if self.fail_news {
            return Err(outage("newsapi"));
        }
        Ok(self.articles.iter().take(max_results).cloned().collect())
    }
}

#[async_trait]
impl SearchSource for MockSources {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SourceError> {
        self.record(format!("search:{query}:{max_results}"));
        if self.fail_search {
            return Err(outage("duckduckgo"));
        }
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

pub fn btc_quote() -> PriceQuote {
    PriceQuote {
        name: "Bitcoin".into(),
        symbol: "BTC".into(),
        price_usd: Some(50000.0),
        price_change_24h_pct: Some(2.5),
        market_cap_usd: Some(980_000_000_000.0),
        total_volume_usd: Some(35_000_000_000.0),
    }
}

pub fn btc_market() -> MarketData {
    MarketData {
        name: "Bitcoin".into(),
        symbol: "BTC".into(),
        price_usd: Some(50000.0),
        price_change_24h_pct: Some(2.5),
        price_change_7d_pct: Some(-1.2),
        price_change_30d_pct: Some(8.9),
        market_cap_usd: Some(980_000_000_000.0),
        total_volume_usd: Some(35_000_000_000.0),
        ath_usd: Some(73_000.0),
        ath_change_pct: Some(-31.5),
    }
}

pub fn article(title: &str) -> NewsEntry {
    NewsEntry::Article {
        title: title.into(),
        description: format!("{title} description"),
        url: "https://news.example.com/a".into(),
        published_at: "2026-10-01T12:00:00Z".into(),
        source: "Example Wire".into(),
    }
}

pub fn hit(title: &str) -> SearchHit {
    SearchHit {
        title: title.into(),
        body: format!("{title} summary"),
        url: "https://search.example.com".into(),
    }
}

/// Sources that answer every call successfully with bitcoin data
pub fn healthy_sources() -> MockSources {
    MockSources {
        quote: Some(btc_quote()),
        market: Some(btc_market()),
        articles: vec![article("ETF inflows"), article("Halving recap")],
        hits: vec![hit("Bitcoin outlook")],
        ..MockSources::default()
    }
}
