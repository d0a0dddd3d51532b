//! Graph event types

use serde::{Deserialize, Serialize};

use crate::{graph::Node, state::Intent};

/// Events emitted while a graph run executes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    /// A run started for a thread
    RunStart { thread_id: String },

    /// A node is about to execute
    NodeStart { thread_id: String, node: Node },

    /// A node finished
    NodeEnd {
        thread_id: String,
        node: Node,
        elapsed_ms: u64,
        /// External calls recorded so far this turn
        api_calls: Vec<String>,
    },

    /// The run reached the terminal state
    RunEnd {
        thread_id: String,
        intent: Option<Intent>,
        steps: u32,
    },

    /// The run failed
    Error { thread_id: String, message: String },
}
