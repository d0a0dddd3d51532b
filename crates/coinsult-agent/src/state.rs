//! Conversation state flowing through the execution graph

use std::collections::BTreeMap;
use std::fmt;

use coinsult_ai::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys under which nodes store collected data
pub mod keys {
    pub const PRICE: &str = "price";
    pub const ARTICLES: &str = "articles";
    pub const MARKET: &str = "market";
    pub const NEWS: &str = "news";
    pub const WEB_SEARCH: &str = "web_search";
    pub const WEB_RESULTS: &str = "web_results";
    /// Reserved for the list of external calls made this turn
    pub const API_CALLS: &str = "api_calls";
}

/// Classified purpose of a user turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Price,
    News,
    Analytics,
    Chat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Price => "price",
            Intent::News => "news",
            Intent::Analytics => "analytics",
            Intent::Chat => "chat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "price" => Some(Intent::Price),
            "news" => Some(Intent::News),
            "analytics" => Some(Intent::Analytics),
            "chat" => Some(Intent::Chat),
            _ => None,
        }
    }

    /// Whether this intent needs a coin before any data can be fetched
    pub fn requires_coin(&self) -> bool {
        !matches!(self, Intent::Chat)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data collected during one turn.
///
/// Each node writes its own key. `api_calls` records the external calls in
/// the order they were made.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiData {
    entries: BTreeMap<String, Value>,
    api_calls: Vec<String>,
}

impl ApiData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn record_call(&mut self, label: impl Into<String>) {
        self.api_calls.push(label.into());
    }

    pub fn api_calls(&self) -> &[String] {
        &self.api_calls
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.api_calls.is_empty()
    }

    /// Add another node's results. Existing keys written by other nodes are kept.
    pub fn merge(&mut self, other: ApiData) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
        self.api_calls.extend(other.api_calls);
    }

    /// Render as a single JSON object, `api_calls` included
    pub fn to_json(&self) -> Value {
        let mut map: serde_json::Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert(
            keys::API_CALLS.to_string(),
            Value::from(self.api_calls.clone()),
        );
        Value::Object(map)
    }
}

/// The unit of state every node reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// User and assistant turns, oldest first
    pub messages: Vec<ChatMessage>,
    /// Raw text of the current turn
    pub user_query: String,
    pub intent: Option<Intent>,
    /// Normalized coin id, empty when unknown
    pub coin: String,
    pub api_data: ApiData,
    pub response: Option<String>,
    pub thread_id: String,
}

impl ConversationState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            ..Self::default()
        }
    }

    /// Start a new turn on top of the thread's last saved state.
    ///
    /// History and the established coin carry over; per-turn fields start empty.
    pub fn begin_turn(
        prior: Option<ConversationState>,
        thread_id: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        let query = query.into();
        let (mut messages, coin) = match prior {
            Some(prior) => (prior.messages, prior.coin),
            None => (Vec::new(), String::new()),
        };
        messages.push(ChatMessage::user(query.clone()));

        Self {
            messages,
            user_query: query,
            intent: None,
            coin,
            api_data: ApiData::new(),
            response: None,
            thread_id: thread_id.into(),
        }
    }

    /// Merge a node's partial update
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(intent) = update.intent {
            self.intent = Some(intent);
        }
        if let Some(coin) = update.coin {
            self.coin = coin;
        }
        if let Some(api_data) = update.api_data {
            self.api_data.merge(api_data);
        }
        if let Some(response) = update.response {
            self.response = Some(response);
        }
        self.messages.extend(update.messages);
    }

    /// Intent name as reported to callers
    pub fn intent_str(&self) -> &'static str {
        self.intent.map(|i| i.as_str()).unwrap_or("unknown")
    }
}

/// Partial state returned by a node
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub intent: Option<Intent>,
    pub coin: Option<String>,
    pub api_data: Option<ApiData>,
    pub response: Option<String>,
    pub messages: Vec<ChatMessage>,
}

impl StateUpdate {
    pub fn classified(intent: Intent, coin: impl Into<String>) -> Self {
        Self {
            intent: Some(intent),
            coin: Some(coin.into()),
            ..Self::default()
        }
    }

    pub fn data(api_data: ApiData) -> Self {
        Self {
            api_data: Some(api_data),
            ..Self::default()
        }
    }

    /// Final answer, also recorded as an assistant turn
    pub fn reply(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            messages: vec![ChatMessage::assistant(text.clone())],
            response: Some(text),
            ..Self::default()
        }
    }
}
