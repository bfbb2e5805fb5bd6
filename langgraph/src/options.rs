//! Per-call and compile-time option bundles. Plain `Default`-able structs,
//! no builder macro: a caller constructs one with struct-update syntax over
//! `..Default::default()` rather than chaining setters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::channel_manager::TriggerMode;
use crate::channels::MergeConfig;
use crate::checkpoint::{CheckpointStore, Codec};
use crate::task_manager::CancelSignal;

/// An ordered sequence of node keys naming a node within a (possibly nested)
/// graph; empty path = top-level graph.
pub type NodePath = Vec<String>;

/// User hook invoked at well-defined points in the run: graph start/end/error,
/// node start/complete. Every method has a no-op default so callers only
/// implement what they need.
pub trait CallbackHandler: Send + Sync {
    fn on_graph_start(&self, _name: &str) {}
    fn on_graph_end(&self, _name: &str) {}
    fn on_graph_error(&self, _name: &str, _error: &str) {}
    fn on_node_start(&self, _node: &str) {}
    fn on_node_complete(&self, _node: &str) {}
}

/// Per-node options are looked up from a keyed sub-structure at dispatch
/// time, validated against the declared type via `convert_option`, rather
/// than passed as a loosely-typed bag.
#[derive(Default, Clone)]
pub struct CallOptions {
    /// Per-node option bundle, addressed by `NodePath`.
    pub per_node: HashMap<NodePath, serde_json::Value>,
    pub callbacks: Vec<Arc<dyn CallbackHandler>>,
    /// Runtime max-steps override; Pregel mode only.
    pub max_steps: Option<u64>,
    /// Checkpoint id to read from (resume) and, when set, to write to.
    pub checkpoint_id: Option<String>,
    pub write_checkpoint_id: Option<String>,
    /// Pure function applied to restored user state before it is installed.
    pub state_modifier: Option<Arc<dyn Fn(serde_json::Value) -> serde_json::Value + Send + Sync>>,
    /// Ignore any stored checkpoint for `checkpoint_id` and start fresh.
    pub force_new_run: bool,
    /// External cancellation token, checked at every iteration boundary.
    /// When fired, the run drains in-flight tasks (bounded by this same
    /// token's deadline, if any) and returns `GraphError::Cancelled` rather
    /// than an interrupt.
    pub cancel: Option<CancelSignal>,
    /// User-interrupt channel, installed per-run. Races `TaskManager::wait`:
    /// fired without a deadline lets in-flight tasks finish normally; fired
    /// with a deadline turns any task still in flight at the deadline into
    /// a rerun candidate on the next resume.
    pub interrupt_signal: Option<CancelSignal>,
}

impl CallOptions {
    /// Deserializes and validates a per-node option against its declared
    /// shape, returning `None` if nothing is registered for `path` or the
    /// registered value doesn't match `T`.
    pub fn convert_option<T: serde::de::DeserializeOwned>(&self, path: &NodePath) -> Option<T> {
        self.per_node
            .get(path)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Compile-time configuration for a graph.
#[derive(Clone)]
pub struct CompileOptions {
    pub name: String,
    /// Compile-time default for Pregel's step budget; DAG mode ignores it.
    pub max_steps: u64,
    pub trigger_mode: TriggerMode,
    /// When set, the task manager's "run inline instead of spawning"
    /// optimization is disabled even when it would otherwise apply.
    pub eager_execution_disabled: bool,
    pub interrupt_before: HashSet<String>,
    pub interrupt_after: HashSet<String>,
    pub merge_configs: HashMap<String, MergeConfig>,
    pub checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    pub codec: Arc<dyn Codec>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            name: "graph".to_string(),
            max_steps: 25,
            trigger_mode: TriggerMode::AllPredecessor,
            eager_execution_disabled: false,
            interrupt_before: HashSet::new(),
            interrupt_after: HashSet::new(),
            merge_configs: HashMap::new(),
            checkpoint_store: None,
            codec: Arc::new(crate::checkpoint::JsonCodec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: convert_option deserializes a per-node option that matches the requested shape.
    #[test]
    fn convert_option_deserializes_matching_shape() {
        let mut opts = CallOptions::default();
        opts.per_node
            .insert(vec!["n2".to_string()], serde_json::json!({"retries": 3}));

        #[derive(serde::Deserialize)]
        struct Opt {
            retries: u32,
        }
        let parsed: Option<Opt> = opts.convert_option(&vec!["n2".to_string()]);
        assert_eq!(parsed.unwrap().retries, 3);
    }

    /// **Scenario**: convert_option returns None for a path with no registered option.
    #[test]
    fn convert_option_missing_path_returns_none() {
        let opts = CallOptions::default();
        let parsed: Option<serde_json::Value> = opts.convert_option(&vec!["missing".to_string()]);
        assert!(parsed.is_none());
    }

    /// **Scenario**: a freshly defaulted CompileOptions uses AllPredecessor (DAG) trigger mode.
    #[test]
    fn default_compile_options_uses_dag_mode() {
        let opts = CompileOptions::default();
        assert_eq!(opts.trigger_mode, TriggerMode::AllPredecessor);
        assert_eq!(opts.max_steps, 25);
    }
}
