//! The channel fabric: per-node input buffer and readiness predicate.
//!
//! Two disciplines share the [`Channel`] trait: [`PregelChannel`] (single
//! merged value per superstep, reset after it is read) and [`DagChannel`]
//! (ready only once every declared predecessor key has reported).
//! [`ChannelManager`](crate::channel_manager::ChannelManager) owns one of
//! these per declared node.

mod dag;
mod pregel;

pub use dag::DagChannel;
pub use pregel::PregelChannel;

use crate::error::GraphError;
use crate::value::Value;

/// Per-edge/per-node merge policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeConfig {
    /// When merging multiple streaming predecessor inputs into one, emit a
    /// distinguished end-of-source marker per upstream end before the final end.
    pub stream_merge_with_source_eof: bool,
}

/// Declared edge-handler chain applied when a value routes from one predecessor
/// to this channel's target node; see `channel_manager::EdgeHandler`.
pub type HandlerChain = Vec<std::sync::Arc<dyn crate::channel_manager::EdgeHandler>>;

/// Per-target-node input buffer with a discipline-specific readiness predicate.
///
/// Implementors are owned exclusively by the `ChannelManager`; only the
/// `Runner`'s single iteration loop calls into them.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    /// Records values reported from predecessors for the current iteration.
    /// Keys not in the declared data-predecessor set are ignored; any stream
    /// value among them is closed immediately to prevent leaks.
    async fn report_values(&mut self, from_values: Vec<(String, Value)>);

    /// Records that the named control-only predecessors have resolved
    /// (delivered a value elsewhere, or been skipped).
    fn report_dependencies(&mut self, from: &[String]);

    /// Marks the named predecessors as skipped. Returns `true` iff this
    /// causes the channel's own target node to become wholly skipped.
    fn report_skip(&mut self, from: &[String]) -> bool;

    /// If ready, computes the merged input and atomically consumes the ready
    /// state (so the same readiness cannot be observed twice). Returns `None`
    /// if not ready.
    async fn get(&mut self, merge: MergeConfig) -> Result<Option<Value>, GraphError>;

    /// True iff the discipline's readiness predicate is currently satisfied.
    fn is_ready(&self) -> bool;

    /// True iff this channel's target node has been determined skipped.
    fn is_skipped(&self) -> bool;

    /// Applies a transformation to every stored predecessor->value entry.
    /// Used by checkpoint capture/restore to switch between materialized and
    /// stream forms without disturbing readiness state.
    async fn convert_values(&mut self, f: &dyn Fn(Value) -> Value);

    /// Overwrites this channel's internal state from a checkpoint snapshot of
    /// the same variant. Panics (via a failed downcast) if `other` is not the
    /// same concrete type; the `ChannelManager` only ever loads like-for-like.
    fn load(&mut self, other: &dyn Channel);

    /// Snapshot of this channel's contents for checkpoint capture.
    fn snapshot(&self) -> ChannelSnapshot;

    /// Restores from a snapshot produced by `snapshot`.
    fn restore(&mut self, snapshot: ChannelSnapshot);

    fn as_any(&self) -> &dyn std::any::Any;
}

/// A serializable capture of one channel's contents, used inside
/// [`crate::checkpoint::Checkpoint`]. The two disciplines populate different
/// fields; the unused one is left at its default.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ChannelSnapshot {
    /// Pregel: the single pending value for the next superstep, if any.
    pub pregel_value: Option<serde_json::Value>,
    pub pregel_ready: bool,
    pub pregel_skipped: bool,
    /// DAG: values already reported, keyed by predecessor.
    pub dag_values: std::collections::HashMap<String, serde_json::Value>,
    /// DAG: control predecessors already resolved.
    pub dag_resolved_controls: std::collections::HashSet<String>,
    /// DAG: predecessors marked skipped.
    pub dag_skipped: std::collections::HashSet<String>,
    pub dag_consumed: bool,
}
