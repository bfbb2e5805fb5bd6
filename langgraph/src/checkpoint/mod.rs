//! Checkpoint capture/restore across interrupts.
//!
//! Storage and wire-format are two separate injected collaborators: a
//! byte-oriented [`CheckpointStore`] that only knows how to get/set bytes
//! under an id, and a [`Codec`] that only knows how to marshal a
//! [`Checkpoint`] to and from those bytes. Keeping them apart means a new
//! backend or a new wire format is a new implementation of one trait, not a
//! change to the capture/restore orchestration in [`CheckpointManager`].

mod codec;
mod manager;
mod store;

pub use codec::{Codec, JsonCodec};
pub use manager::CheckpointManager;
pub use store::{CheckpointStore, InMemoryCheckpointStore};

use std::collections::HashMap;

use crate::channels::ChannelSnapshot;

/// Serializable snapshot sufficient to resume a run at the next iteration
/// boundary.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Checkpoint {
    /// Channel contents, keyed by node id.
    pub channels: HashMap<String, ChannelSnapshot>,
    /// Inputs for tasks that were planned but not yet executed at interrupt time.
    pub pending_inputs: HashMap<String, serde_json::Value>,
    /// User state, if the run has state enabled.
    pub user_state: Option<serde_json::Value>,
    /// Nodes whose inputs were already pre-processed; skip their pre-handler on resume.
    pub skip_pre_handler: std::collections::HashSet<String>,
    /// Nodes that requested rerun, or whose sub-graph interrupted, on resume.
    pub rerun_nodes: Vec<String>,
    /// Per-tool-node map of already-executed tool call ids, so a resumed tool
    /// node does not re-invoke them.
    pub executed_tools: HashMap<String, Vec<String>>,
    /// Nested sub-graph checkpoints, keyed by the sub-graph node's key.
    pub sub_graphs: HashMap<String, Checkpoint>,
}

// `serde::Serialize` for `ChannelSnapshot` lives alongside its definition in
// `channels/mod.rs`; add derives there so this module does not need to know
// about channel internals beyond the type name.

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a default Checkpoint has no pending state and round-trips through the default Codec.
    #[test]
    fn default_checkpoint_is_empty() {
        let cp = Checkpoint::default();
        assert!(cp.channels.is_empty());
        assert!(cp.pending_inputs.is_empty());
        assert!(cp.rerun_nodes.is_empty());
    }
}
