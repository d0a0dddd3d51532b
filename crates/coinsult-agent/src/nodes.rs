//! Node handlers of the execution graph.
//!
//! Data-fetch nodes never fail: a source error is logged with the turn's
//! context and stored as an `{"error": ...}` placeholder. Only nodes that call
//! the model return `Result`.

use chrono::{Datelike, Utc};
use coinsult_ai::{ChatMessage, ChatModel};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    error::{Result, SourceError},
    format::{format_news_data, format_price_data, format_search_data, preview},
    sources::Sources,
    state::{ApiData, ConversationState, Intent, StateUpdate, keys},
};

/// Labels recorded in `api_calls`
pub mod calls {
    pub const COINGECKO_MARKETS: &str = "coingecko:/coins/markets";
    pub const COINGECKO_COIN: &str = "coingecko:/coins/{id}";
    pub const NEWSAPI_EVERYTHING: &str = "newsapi:/v2/everything";
    pub const DUCKDUCKGO_SEARCH: &str = "duckduckgo:search";
}

pub const NEWS_RESULTS: usize = 5;
pub const ANALYTICS_NEWS_RESULTS: usize = 3;
pub const ANALYTICS_SEARCH_RESULTS: usize = 3;
pub const WEB_SEARCH_RESULTS: usize = 5;

const QUERY_LOG_LIMIT: usize = 160;

const ANALYZE_PROMPT: &str = "You are an experienced crypto analyst. Analyze the data provided \
and give a detailed analytical answer in the user's language.

Structure the answer as follows:
1. **Current state**: price, momentum, volumes
2. **Trend**: short and medium term, based on the 24h, 7d and 30d changes
3. **News background**: a short review of recent news and its likely impact
4. **Risk assessment**: the main risks for an investor
5. **Recommendation**: an overall stance (cautious / neutral / positive) with reasoning

IMPORTANT: this is not financial advice. Always end with a disclaimer saying so.";

const RESPONSE_PROMPT: &str = "You are a friendly crypto consultant. Answer in the user's \
language, briefly and to the point. Use the data provided to build the answer.

If the data contains an error, tell the user about it politely and suggest refining the request.";

fn error_placeholder(error: &SourceError) -> Value {
    json!({ "error": error.to_string() })
}

fn to_entry<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

fn log_node_error(node: &str, state: &ConversationState, error: &SourceError) {
    tracing::error!(
        node,
        thread_id = %state.thread_id,
        intent = state.intent_str(),
        coin = %state.coin,
        query = %preview(&state.user_query, QUERY_LOG_LIMIT),
        error = %error,
        "external call failed"
    );
}

/// Query for the supplemental analytics search
pub fn analytics_search_query(coin: &str, year: i32) -> String {
    format!("{coin} crypto analysis forecast {year}")
}

pub async fn get_price(sources: &Sources, state: &ConversationState) -> StateUpdate {
    let entry = match sources.prices.price(&state.coin).await {
        Ok(quote) => to_entry(&quote),
        Err(e) => {
            log_node_error("get_price", state, &e);
            error_placeholder(&e)
        }
    };

    let mut data = ApiData::new();
    data.insert(keys::PRICE, entry);
    data.record_call(calls::COINGECKO_MARKETS);
    StateUpdate::data(data)
}

pub async fn get_news(sources: &Sources, state: &ConversationState) -> StateUpdate {
    let entry = match sources.news.news(&state.coin, NEWS_RESULTS).await {
        Ok(articles) => to_entry(&articles),
        Err(e) => {
            log_node_error("get_news", state, &e);
            Value::Array(vec![error_placeholder(&e)])
        }
    };

    let mut data = ApiData::new();
    data.insert(keys::ARTICLES, entry);
    data.record_call(calls::NEWSAPI_EVERYTHING);
    StateUpdate::data(data)
}

/// Market data and news, fetched concurrently. Either may fail alone.
pub async fn get_analytics_data(sources: &Sources, state: &ConversationState) -> StateUpdate {
    let (market, news) = tokio::join!(
        sources.prices.market_data(&state.coin),
        sources.news.news(&state.coin, ANALYTICS_NEWS_RESULTS),
    );

    let market = match market {
        Ok(market) => to_entry(&market),
        Err(e) => {
            log_node_error("get_analytics_data.market", state, &e);
            error_placeholder(&e)
        }
    };
    let news = match news {
        Ok(articles) => to_entry(&articles),
        Err(e) => {
            log_node_error("get_analytics_data.news", state, &e);
            Value::Array(vec![error_placeholder(&e)])
        }
    };

    let mut data = ApiData::new();
    data.insert(keys::MARKET, market);
    data.insert(keys::NEWS, news);
    data.record_call(calls::COINGECKO_COIN);
    data.record_call(calls::NEWSAPI_EVERYTHING);
    StateUpdate::data(data)
}

pub async fn analytics_search(sources: &Sources, state: &ConversationState) -> StateUpdate {
    let query = analytics_search_query(&state.coin, Utc::now().year());
    let entry = match sources.search.search(&query, ANALYTICS_SEARCH_RESULTS).await {
        Ok(hits) => to_entry(&hits),
        Err(e) => {
            log_node_error("analytics_search", state, &e);
            Value::Array(vec![error_placeholder(&e)])
        }
    };

    let mut data = ApiData::new();
    data.insert(keys::WEB_SEARCH, entry);
    data.record_call(calls::DUCKDUCKGO_SEARCH);
    StateUpdate::data(data)
}

pub async fn web_search(sources: &Sources, state: &ConversationState) -> StateUpdate {
    let entry = match sources.search.search(&state.user_query, WEB_SEARCH_RESULTS).await {
        Ok(hits) => to_entry(&hits),
        Err(e) => {
            log_node_error("web_search", state, &e);
            Value::Array(vec![error_placeholder(&e)])
        }
    };

    let mut data = ApiData::new();
    data.insert(keys::WEB_RESULTS, entry);
    data.record_call(calls::DUCKDUCKGO_SEARCH);
    StateUpdate::data(data)
}

/// Ask the user to name a coin. No external calls.
pub fn clarify_coin(state: &ConversationState) -> StateUpdate {
    let topic = match state.intent {
        Some(Intent::Price) => "the price",
        Some(Intent::News) => "the news",
        Some(Intent::Analytics) => "an analysis",
        _ => "the information",
    };
    StateUpdate::reply(format!(
        "Please tell me which cryptocurrency you mean so I can give you {topic}. \
         For example: Bitcoin, ETH, SOL."
    ))
}

pub async fn analyze(model: &dyn ChatModel, state: &ConversationState) -> Result<StateUpdate> {
    let payload = serde_json::to_string_pretty(&state.api_data.to_json()).unwrap_or_default();
    let messages = vec![
        ChatMessage::system(ANALYZE_PROMPT),
        ChatMessage::user(format!(
            "User query: {}\n\nCollected data:\n{payload}",
            state.user_query
        )),
    ];
    let text = model.generate(&messages).await?;
    Ok(StateUpdate::reply(text))
}

/// Data block matching the turn's intent
pub fn render_data(state: &ConversationState) -> String {
    let data = &state.api_data;
    match state.intent {
        Some(Intent::Price) => format_price_data(data.get(keys::PRICE).unwrap_or(&Value::Null)),
        Some(Intent::News) => format_news_data(data.get(keys::ARTICLES)),
        _ => format_search_data(data.get(keys::WEB_RESULTS)),
    }
}

pub async fn generate_response(
    model: &dyn ChatModel,
    state: &ConversationState,
) -> Result<StateUpdate> {
    let messages = vec![
        ChatMessage::system(RESPONSE_PROMPT),
        ChatMessage::user(format!(
            "User query: {}\n\nData:\n{}",
            state.user_query,
            render_data(state)
        )),
    ];
    let text = model.generate(&messages).await?;
    Ok(StateUpdate::reply(text))
}
