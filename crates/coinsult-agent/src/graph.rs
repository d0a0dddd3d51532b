//! Fixed-topology execution graph.
//!
//! The graph is a small state machine: [`Node`] names the steps, [`Graph::execute`]
//! maps a node to its handler and [`Graph::transition`] maps a finished node
//! (plus the routing predicate's answer, for the two conditional edges) to the
//! next node.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use coinsult_ai::ChatModel;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    classifier,
    error::Result,
    events::GraphEvent,
    format::preview,
    nodes,
    routing::{self, IntentRoute, SearchRoute},
    sources::Sources,
    state::{ConversationState, StateUpdate},
};

const STEP_QUERY_LIMIT: usize = 80;

/// Steps of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    ClassifyIntent,
    GetPrice,
    GetNews,
    GetAnalyticsData,
    AnalyticsSearch,
    Analyze,
    WebSearch,
    ClarifyCoin,
    GenerateResponse,
}

impl Node {
    pub const ENTRY: Node = Node::ClassifyIntent;

    pub fn name(&self) -> &'static str {
        match self {
            Node::ClassifyIntent => "classify_intent",
            Node::GetPrice => "get_price",
            Node::GetNews => "get_news",
            Node::GetAnalyticsData => "get_analytics_data",
            Node::AnalyticsSearch => "analytics_search",
            Node::Analyze => "analyze",
            Node::WebSearch => "web_search",
            Node::ClarifyCoin => "clarify_coin",
            Node::GenerateResponse => "generate_response",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target of the primary router's answer
pub fn intent_target(route: IntentRoute) -> Node {
    match route {
        IntentRoute::Price => Node::GetPrice,
        IntentRoute::News => Node::GetNews,
        IntentRoute::Analytics => Node::GetAnalyticsData,
        IntentRoute::Chat => Node::WebSearch,
        IntentRoute::ClarifyCoin => Node::ClarifyCoin,
    }
}

/// Target of the analytics sub-router's answer
pub fn search_target(route: SearchRoute) -> Node {
    match route {
        SearchRoute::NeedsSearch => Node::AnalyticsSearch,
        SearchRoute::NoSearch => Node::Analyze,
    }
}

/// Fixed edge out of a node. `None` for terminal nodes.
///
/// The two conditional nodes have no fixed edge; [`Graph::transition`]
/// resolves them before consulting this table.
pub fn fixed_edge(node: Node) -> Option<Node> {
    match node {
        Node::GetPrice | Node::GetNews | Node::WebSearch => Some(Node::GenerateResponse),
        Node::AnalyticsSearch => Some(Node::Analyze),
        Node::ClassifyIntent
        | Node::GetAnalyticsData
        | Node::Analyze
        | Node::ClarifyCoin
        | Node::GenerateResponse => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphConfig {
    /// Log every node entry and exit at info level
    pub debug_nodes: bool,
}

/// Runs one turn through the graph
pub struct Graph {
    model: Arc<dyn ChatModel>,
    sources: Sources,
    config: GraphConfig,
    event_tx: broadcast::Sender<GraphEvent>,
}

impl Graph {
    pub fn new(model: Arc<dyn ChatModel>, sources: Sources) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            model,
            sources,
            config: GraphConfig::default(),
            event_tx,
        }
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Subscribe to graph events
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.event_tx.subscribe()
    }

    /// Execute from the entry node until a terminal node finishes
    pub async fn run(&self, mut state: ConversationState) -> Result<ConversationState> {
        let _ = self.event_tx.send(GraphEvent::RunStart {
            thread_id: state.thread_id.clone(),
        });

        let mut current = Some(Node::ENTRY);
        let mut steps = 0u32;

        while let Some(node) = current {
            steps += 1;
            let update = match self.step(node, &state).await {
                Ok(update) => update,
                Err(e) => {
                    tracing::error!(node = node.name(), thread_id = %state.thread_id, error = %e, "[graph] !! node failed");
                    let _ = self.event_tx.send(GraphEvent::Error {
                        thread_id: state.thread_id.clone(),
                        message: format!("{}: {}", node, e),
                    });
                    return Err(e);
                }
            };
            state.apply(update);

            current = match self.transition(node, &state).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(node = node.name(), thread_id = %state.thread_id, error = %e, "[graph] !! routing failed");
                    let _ = self.event_tx.send(GraphEvent::Error {
                        thread_id: state.thread_id.clone(),
                        message: format!("routing after {}: {}", node, e),
                    });
                    return Err(e);
                }
            };
        }

        let _ = self.event_tx.send(GraphEvent::RunEnd {
            thread_id: state.thread_id.clone(),
            intent: state.intent,
            steps,
        });
        Ok(state)
    }

    /// Run one node with tracing and events around it
    async fn step(&self, node: Node, state: &ConversationState) -> Result<StateUpdate> {
        let _ = self.event_tx.send(GraphEvent::NodeStart {
            thread_id: state.thread_id.clone(),
            node,
        });
        if self.config.debug_nodes {
            tracing::info!(
                "[graph] -> {} | intent={:?}, coin={:?}, query={:?}",
                node,
                state.intent_str(),
                state.coin,
                preview(&state.user_query, STEP_QUERY_LIMIT)
            );
        } else {
            tracing::debug!(node = node.name(), "entering node");
        }

        let start = Instant::now();
        let update = self.execute(node, state).await?;
        let elapsed = start.elapsed();

        let mut api_calls = state.api_data.api_calls().to_vec();
        if let Some(data) = &update.api_data {
            api_calls.extend_from_slice(data.api_calls());
        }

        if self.config.debug_nodes {
            tracing::info!(
                "[graph] <- {} | {:.1} ms | api_calls={:?}",
                node,
                elapsed.as_secs_f64() * 1000.0,
                api_calls
            );
        } else {
            tracing::debug!(node = node.name(), elapsed_ms = elapsed.as_millis() as u64, "node finished");
        }

        let _ = self.event_tx.send(GraphEvent::NodeEnd {
            thread_id: state.thread_id.clone(),
            node,
            elapsed_ms: elapsed.as_millis() as u64,
            api_calls,
        });
        Ok(update)
    }

    /// Node → handler
    async fn execute(&self, node: Node, state: &ConversationState) -> Result<StateUpdate> {
        let model = self.model.as_ref();
        let sources = &self.sources;

        let update = match node {
            Node::ClassifyIntent => {
                let c = classifier::classify(model, state).await?;
                StateUpdate::classified(c.intent, c.coin)
            }
            Node::GetPrice => nodes::get_price(sources, state).await,
            Node::GetNews => nodes::get_news(sources, state).await,
            Node::GetAnalyticsData => nodes::get_analytics_data(sources, state).await,
            Node::AnalyticsSearch => nodes::analytics_search(sources, state).await,
            Node::WebSearch => nodes::web_search(sources, state).await,
            Node::ClarifyCoin => nodes::clarify_coin(state),
            Node::Analyze => nodes::analyze(model, state).await?,
            Node::GenerateResponse => nodes::generate_response(model, state).await?,
        };
        Ok(update)
    }

    /// (node, predicate result) → next node
    async fn transition(&self, node: Node, state: &ConversationState) -> Result<Option<Node>> {
        let next = match node {
            Node::ClassifyIntent => {
                let route = routing::route_by_intent(state);
                self.trace_route("route_by_intent", &format!("{route:?}"));
                Some(intent_target(route))
            }
            Node::GetAnalyticsData => {
                let route = routing::route_needs_search(self.model.as_ref(), state).await?;
                self.trace_route("route_needs_search", &format!("{route:?}"));
                Some(search_target(route))
            }
            other => fixed_edge(other),
        };
        Ok(next)
    }

    fn trace_route(&self, predicate: &str, outcome: &str) {
        if self.config.debug_nodes {
            tracing::info!("[graph] {} => {}", predicate, outcome);
        } else {
            tracing::debug!(predicate, outcome, "route chosen");
        }
    }
}
