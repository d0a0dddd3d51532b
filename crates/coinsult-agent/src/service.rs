//! Caller-facing chat surface

use std::sync::Arc;
use std::time::Duration;

use coinsult_ai::ChatModel;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    error::{Error, Result},
    events::GraphEvent,
    graph::{Graph, GraphConfig},
    memory::MemoryStore,
    sources::Sources,
    state::ConversationState,
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const NO_RESPONSE: &str = "Failed to get a response.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            thread_id: None,
        }
    }

    pub fn on_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub thread_id: String,
    pub intent: String,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// End-to-end deadline for one turn
    pub timeout: Duration,
    pub debug_nodes: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug_nodes: false,
        }
    }
}

/// Runs turns against the graph and keeps per-thread memory
pub struct ChatService {
    graph: Graph,
    memory: Arc<MemoryStore>,
    timeout: Duration,
}

impl ChatService {
    pub fn new(model: Arc<dyn ChatModel>, sources: Sources, config: ServiceConfig) -> Self {
        let graph = Graph::new(model, sources).with_config(GraphConfig {
            debug_nodes: config.debug_nodes,
        });
        if config.debug_nodes {
            tracing::info!("[graph] node debug logging enabled");
        }
        Self {
            graph,
            memory: Arc::new(MemoryStore::new()),
            timeout: config.timeout,
        }
    }

    /// Use an existing memory store
    pub fn with_memory(mut self, memory: Arc<MemoryStore>) -> Self {
        self.memory = memory;
        self
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.graph.subscribe()
    }

    /// Run one turn.
    ///
    /// A blank or missing thread id starts a new thread. The deadline covers
    /// waiting for an earlier turn on the same thread; when it expires nothing
    /// is saved.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let thread_id = request
            .thread_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        match tokio::time::timeout(self.timeout, self.run_turn(thread_id.clone(), request.message))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(thread_id = %thread_id, timeout = ?self.timeout, "turn timed out");
                Err(Error::Timeout {
                    seconds: self.timeout.as_secs_f64(),
                })
            }
        }
    }

    async fn run_turn(&self, thread_id: String, message: String) -> Result<ChatResponse> {
        let turn_lock = self.memory.turn_lock(&thread_id);
        let _turn = turn_lock.acquire().await;

        let prior = self.memory.load(&thread_id);
        let state = ConversationState::begin_turn(prior, thread_id.clone(), message);
        let state = self.graph.run(state).await?;

        let response = ChatResponse {
            response: state.response.clone().unwrap_or_else(|| NO_RESPONSE.to_string()),
            thread_id: thread_id.clone(),
            intent: state.intent_str().to_string(),
        };
        self.memory.save(&thread_id, state);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockModel, healthy_sources};

    fn service(model: Arc<MockModel>, timeout: Duration) -> ChatService {
        let (_, sources) = healthy_sources().into_sources();
        ChatService::new(
            model,
            sources,
            ServiceConfig {
                timeout,
                debug_nodes: false,
            },
        )
    }

    #[tokio::test]
    async fn test_price_question_end_to_end() {
        let model = Arc::new(MockModel::new([
            r#"{"intent": "price", "coin": "bitcoin"}"#,
            "Bitcoin is trading at $50,000.00.",
        ]));
        let service = service(model.clone(), Duration::from_secs(5));

        let reply = service
            .chat(ChatRequest::new("Сколько стоит Bitcoin?"))
            .await
            .unwrap();

        assert_eq!(reply.intent, "price");
        assert_eq!(reply.response, "Bitcoin is trading at $50,000.00.");
        assert!(uuid::Uuid::parse_str(&reply.thread_id).is_ok());
        assert!(model.user_prompts()[1].contains("50,000.00"));
    }

    #[tokio::test]
    async fn test_blank_thread_id_gets_fresh_uuid() {
        let model = Arc::new(MockModel::new([r#"{"intent": "price", "coin": ""}"#]));
        let service = service(model, Duration::from_secs(5));
        let reply = service
            .chat(ChatRequest::new("price?").on_thread("   "))
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(&reply.thread_id).is_ok());
    }

    #[tokio::test]
    async fn test_follow_up_reuses_coin() {
        let model = Arc::new(MockModel::new([
            r#"{"intent": "price", "coin": "bitcoin"}"#,
            "Bitcoin is at $50,000.00.",
            r#"{"intent": "analytics", "coin": ""}"#,
            "no",
            "Analysis of bitcoin. Not financial advice.",
        ]));
        let service = service(model.clone(), Duration::from_secs(5));

        let first = service
            .chat(ChatRequest::new("what's the price of bitcoin?").on_thread("t-1"))
            .await
            .unwrap();
        assert_eq!(first.intent, "price");
        assert_eq!(service.memory().turn_lock_count(), 0);

        let second = service
            .chat(ChatRequest::new("should I buy more of it right now?").on_thread("t-1"))
            .await
            .unwrap();
        assert_eq!(second.intent, "analytics");
        assert_eq!(second.thread_id, "t-1");

        let state = service.memory().load("t-1").unwrap();
        assert_eq!(state.coin, "bitcoin");
        assert_eq!(state.messages.len(), 4);

        // The classifier saw the first exchange in its history.
        let classify_prompt = &model.user_prompts()[2];
        assert!(classify_prompt.contains("user: what's the price of bitcoin?"));
        assert!(classify_prompt.contains("assistant: Bitcoin is at $50,000.00."));
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_thread_run_in_order() {
        let model = Arc::new(
            MockModel::new([
                r#"{"intent": "price", "coin": "bitcoin"}"#,
                "Bitcoin is at $50,000.00.",
                r#"{"intent": "analytics", "coin": ""}"#,
                "no",
                "Analysis of bitcoin. Not financial advice.",
            ])
            .with_delay(Duration::from_millis(50)),
        );
        let service = service(model.clone(), Duration::from_secs(5));

        let (first, second) = tokio::join!(
            service.chat(ChatRequest::new("what's the price of bitcoin?").on_thread("t-1")),
            service.chat(ChatRequest::new("should I buy more of it right now?").on_thread("t-1")),
        );
        assert_eq!(first.unwrap().intent, "price");
        assert_eq!(second.unwrap().intent, "analytics");

        let state = service.memory().load("t-1").unwrap();
        assert_eq!(state.coin, "bitcoin");
        assert_eq!(state.messages.len(), 4);

        // The second turn waited and classified with the first exchange in view.
        let classify_prompt = &model.user_prompts()[2];
        assert!(classify_prompt.contains("user: what's the price of bitcoin?"));
        assert!(classify_prompt.contains("assistant: Bitcoin is at $50,000.00."));
        assert_eq!(service.memory().turn_lock_count(), 0);
    }

    #[tokio::test]
    async fn test_restart_loses_coin_context() {
        let model = Arc::new(MockModel::new([
            r#"{"intent": "price", "coin": "bitcoin"}"#,
            "Bitcoin is at $50,000.00.",
            r#"{"intent": "analytics", "coin": ""}"#,
        ]));
        let service = service(model.clone(), Duration::from_secs(5));
        service
            .chat(ChatRequest::new("what's the price of bitcoin?").on_thread("t-1"))
            .await
            .unwrap();

        // Same thread id, empty memory.
        let service = service.with_memory(Arc::new(MemoryStore::new()));
        let reply = service
            .chat(ChatRequest::new("should I buy more of it right now?").on_thread("t-1"))
            .await
            .unwrap();

        assert_eq!(reply.intent, "analytics");
        assert!(reply.response.contains("which cryptocurrency"));
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_new_thread_starts_clean() {
        let model = Arc::new(MockModel::new([
            r#"{"intent": "price", "coin": "bitcoin"}"#,
            "Bitcoin is at $50,000.00.",
            r#"{"intent": "news", "coin": ""}"#,
        ]));
        let service = service(model, Duration::from_secs(5));
        service
            .chat(ChatRequest::new("btc price").on_thread("old"))
            .await
            .unwrap();
        let reply = service
            .chat(ChatRequest::new("any news about it?").on_thread("new"))
            .await
            .unwrap();
        assert!(reply.response.contains("the news"));
    }

    #[tokio::test]
    async fn test_timeout_keeps_previous_memory() {
        let model = Arc::new(MockModel::new([
            r#"{"intent": "price", "coin": "bitcoin"}"#,
            "Bitcoin is at $50,000.00.",
        ]));
        let service = service(model.clone(), Duration::from_secs(5));
        service
            .chat(ChatRequest::new("btc price").on_thread("t-1"))
            .await
            .unwrap();
        let before = service.memory().load("t-1").unwrap();

        let slow = Arc::new(
            MockModel::new([r#"{"intent": "price", "coin": "solana"}"#, "SOL is at $150."])
                .with_delay(Duration::from_millis(200)),
        );
        let (_, sources) = healthy_sources().into_sources();
        let slow_service = ChatService::new(
            slow,
            sources,
            ServiceConfig {
                timeout: Duration::from_millis(50),
                debug_nodes: false,
            },
        )
        .with_memory(service.memory().clone());

        let err = slow_service
            .chat(ChatRequest::new("and solana?").on_thread("t-1"))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let after = service.memory().load("t-1").unwrap();
        assert_eq!(after.coin, before.coin);
        assert_eq!(after.messages, before.messages);
        assert_eq!(service.memory().turn_lock_count(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_reported() {
        let model = Arc::new(MockModel::new(Vec::<&str>::new()));
        model.push_error("connection refused");
        let service = service(model, Duration::from_secs(5));

        let err = service
            .chat(ChatRequest::new("hello").on_thread("t-1"))
            .await
            .unwrap_err();
        assert!(!err.is_timeout());
        assert!(!service.memory().contains("t-1"));
    }

    #[test]
    fn test_request_shape() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(request.message, "hi");
        assert!(request.thread_id.is_none());
    }
}
