//! The three interrupt signal kinds and the user-facing summary of why a run
//! paused.

use std::collections::HashMap;

use crate::checkpoint::Checkpoint;

/// User-facing summary of why a run paused. Carried by `GraphError::Interrupted`
/// and nested under a sub-graph node's key inside its parent's `InterruptInfo`,
/// so a nested interrupt never escapes its own sub-graph boundary.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InterruptInfo {
    pub state: Option<serde_json::Value>,
    pub before_nodes: Vec<String>,
    pub after_nodes: Vec<String>,
    pub rerun_nodes: Vec<String>,
    pub rerun_extra: HashMap<String, serde_json::Value>,
    pub sub_graphs: HashMap<String, InterruptInfo>,
}

impl InterruptInfo {
    pub fn is_empty(&self) -> bool {
        self.before_nodes.is_empty()
            && self.after_nodes.is_empty()
            && self.rerun_nodes.is_empty()
            && self.rerun_extra.is_empty()
            && self.sub_graphs.is_empty()
    }
}

/// A node action's failure outcome: a plain error, a rerun request (a node
/// can ask to be re-invoked, optionally carrying an extra payload for its
/// next invocation), or — for a node whose action is itself a compiled
/// sub-graph — a nested sub-graph interrupt carrying its own `InterruptInfo`
/// and `Checkpoint`.
pub enum NodeFailure {
    Error(Box<dyn std::error::Error + Send + Sync>),
    Rerun(Option<serde_json::Value>),
    SubGraphInterrupt(Box<InterruptInfo>, Box<Checkpoint>),
}

impl std::fmt::Debug for NodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeFailure::Error(e) => write!(f, "NodeFailure::Error({e})"),
            NodeFailure::Rerun(extra) => write!(f, "NodeFailure::Rerun({extra:?})"),
            NodeFailure::SubGraphInterrupt(info, _) => {
                write!(f, "NodeFailure::SubGraphInterrupt({info:?})")
            }
        }
    }
}

/// Compile-time boundary lists naming nodes at whose entry or exit the run
/// must pause. No error is raised by the node itself; the `Runner` detects
/// membership and initiates the interrupt path.
#[derive(Debug, Clone, Default)]
pub struct InterruptBoundaries {
    pub before: std::collections::HashSet<String>,
    pub after: std::collections::HashSet<String>,
}
