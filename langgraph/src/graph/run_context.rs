//! Explicit per-run context threaded through the engine: the node path,
//! cancellation object, and nested sub-graph checkpoint slot a node action
//! needs at call time. A sub-graph descent is simply a nested `RunContext`.

use std::sync::Arc;

use crate::checkpoint::Checkpoint;
use crate::options::NodePath;
use crate::task_manager::CancelSignal;

/// Threaded into every `NodeAction::call`. A sub-graph node constructs a
/// fresh `RunContext` for its nested run, extending `node_path` with its own
/// key and, if resuming, handing down the nested checkpoint captured under
/// that key.
pub struct RunContext {
    pub node_path: NodePath,
    pub cancel: CancelSignal,
    /// Opaque user state reference; access discipline is dictated by the caller.
    pub user_state: Option<serde_json::Value>,
    /// Present only when this context is resuming a sub-graph from a nested
    /// checkpoint captured at a previous interrupt.
    pub resume_checkpoint: Option<Arc<Checkpoint>>,
    /// This node's already-executed tool-call ids, restored from
    /// `Checkpoint::executed_tools` on resume. Empty on a fresh run.
    pub executed_tools: Vec<String>,
}

impl RunContext {
    pub fn top_level() -> Self {
        Self {
            node_path: Vec::new(),
            cancel: CancelSignal::never(),
            user_state: None,
            resume_checkpoint: None,
            executed_tools: Vec::new(),
        }
    }

    pub fn with_cancel(cancel: CancelSignal) -> Self {
        Self {
            node_path: Vec::new(),
            cancel,
            user_state: None,
            resume_checkpoint: None,
            executed_tools: Vec::new(),
        }
    }

    /// Descends into a sub-graph node, extending the path and carrying down
    /// its nested checkpoint (if any) plus the parent's cancellation object.
    pub fn descend(&self, node_key: &str, resume_checkpoint: Option<Arc<Checkpoint>>) -> Self {
        let mut node_path = self.node_path.clone();
        node_path.push(node_key.to_string());
        Self {
            node_path,
            cancel: self.cancel.clone(),
            user_state: self.user_state.clone(),
            resume_checkpoint,
            executed_tools: Vec::new(),
        }
    }

    /// Derives a per-task context that keeps this context's path/cancel/state
    /// but carries a specific node's resume checkpoint and already-executed
    /// tool list, as restored from a checkpoint (`graph::runner::run_loop`).
    pub fn for_task(&self, resume_checkpoint: Option<Arc<Checkpoint>>, executed_tools: Vec<String>) -> Self {
        Self {
            node_path: self.node_path.clone(),
            cancel: self.cancel.clone(),
            user_state: self.user_state.clone(),
            resume_checkpoint,
            executed_tools,
        }
    }
}
