//! Capture/restore orchestration. Delegates storage to [`CheckpointStore`]
//! and the wire format to [`Codec`]; both are injected so the core stays
//! format- and backend-agnostic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::channels::ChannelSnapshot;
use crate::error::GraphError;
use crate::value::{StreamReader, Value};

use super::{Checkpoint, CheckpointStore, Codec};

pub struct CheckpointManager {
    store: Option<Arc<dyn CheckpointStore>>,
    codec: Arc<dyn Codec>,
}

impl CheckpointManager {
    pub fn new(store: Option<Arc<dyn CheckpointStore>>, codec: Arc<dyn Codec>) -> Self {
        Self { store, codec }
    }

    /// Builds a `Checkpoint` from the current run state, materializing any
    /// streaming `pending_inputs` values so the record stays serializable;
    /// non-stream values pass through unchanged.
    pub async fn capture(
        &self,
        channels: HashMap<String, ChannelSnapshot>,
        pending_inputs: HashMap<String, Value>,
        user_state: Option<serde_json::Value>,
        skip_pre_handler: HashSet<String>,
        rerun_nodes: Vec<String>,
        executed_tools: HashMap<String, Vec<String>>,
        sub_graphs: HashMap<String, Checkpoint>,
    ) -> Checkpoint {
        let mut materialized = HashMap::with_capacity(pending_inputs.len());
        for (node, value) in pending_inputs {
            materialized.insert(node, materialize(value).await);
        }
        Checkpoint {
            channels,
            pending_inputs: materialized,
            user_state,
            skip_pre_handler,
            rerun_nodes,
            executed_tools,
            sub_graphs,
        }
    }

    /// Serializes and writes a checkpoint to the injected store under `id`.
    /// Only ever called from the interrupt path — a clean successful run
    /// never writes a checkpoint.
    pub async fn persist(&self, id: &str, checkpoint: &Checkpoint) -> Result<(), GraphError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let bytes = self
            .codec
            .marshal(checkpoint)
            .map_err(GraphError::Serializer)?;
        store.set(id, bytes).await.map_err(GraphError::Store)
    }

    /// Reads and deserializes a checkpoint by id from the injected store.
    pub async fn load(&self, id: &str) -> Result<Checkpoint, GraphError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| GraphError::CheckpointNotFound(id.to_string()))?;
        let bytes = store
            .get(id)
            .await
            .map_err(GraphError::Store)?
            .ok_or_else(|| GraphError::CheckpointNotFound(id.to_string()))?;
        self.codec.unmarshal(&bytes).map_err(GraphError::Serializer)
    }

    /// Reverse of capture's materialization: when the run is streaming,
    /// wraps each materialized pending input back into a single-element
    /// stream; otherwise passes it through unchanged.
    pub fn restore_pending_inputs(checkpoint: &Checkpoint, streaming: bool) -> HashMap<String, Value> {
        checkpoint
            .pending_inputs
            .iter()
            .map(|(node, value)| {
                let v = if streaming {
                    Value::Stream(StreamReader::from_values(vec![value.clone()]))
                } else {
                    Value::Single(value.clone())
                };
                (node.clone(), v)
            })
            .collect()
    }

    /// Rerun-node tasks resume with a zero-value seed input; their
    /// pre-handler rebuilds the real input from the still-populated
    /// channels.
    pub fn rerun_seed_value(streaming: bool) -> Value {
        if streaming {
            Value::Stream(StreamReader::from_values(vec![]))
        } else {
            Value::Single(serde_json::Value::Null)
        }
    }
}

async fn materialize(value: Value) -> serde_json::Value {
    match value {
        Value::Single(v) => v,
        Value::Stream(s) => serde_json::Value::Array(s.collect().await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{InMemoryCheckpointStore, JsonCodec};

    fn manager() -> CheckpointManager {
        CheckpointManager::new(
            Some(Arc::new(InMemoryCheckpointStore::new())),
            Arc::new(JsonCodec),
        )
    }

    /// **Scenario**: capture materializes a streaming pending input into a JSON array.
    #[tokio::test]
    async fn capture_materializes_streams() {
        let mgr = manager();
        let mut pending = HashMap::new();
        pending.insert(
            "n".to_string(),
            Value::Stream(StreamReader::from_values(vec![
                serde_json::json!(1),
                serde_json::json!(2),
            ])),
        );
        let cp = mgr
            .capture(
                HashMap::new(),
                pending,
                None,
                HashSet::new(),
                vec![],
                HashMap::new(),
                HashMap::new(),
            )
            .await;
        assert_eq!(cp.pending_inputs["n"], serde_json::json!([1, 2]));
    }

    /// **Scenario**: persist then load reproduces the same record.
    #[tokio::test]
    async fn persist_then_load_roundtrips() {
        let mgr = manager();
        let mut cp = Checkpoint::default();
        cp.rerun_nodes.push("n2".into());
        mgr.persist("tid-1", &cp).await.unwrap();
        let restored = mgr.load("tid-1").await.unwrap();
        assert_eq!(restored.rerun_nodes, cp.rerun_nodes);
    }

    /// **Scenario**: loading an id that was never written returns CheckpointNotFound.
    #[tokio::test]
    async fn load_missing_id_returns_not_found() {
        let mgr = manager();
        let err = mgr.load("missing").await.unwrap_err();
        assert!(matches!(err, GraphError::CheckpointNotFound(_)));
    }

    /// **Scenario**: restore_pending_inputs wraps materialized values back into single-element streams when streaming.
    #[test]
    fn restore_pending_inputs_wraps_when_streaming() {
        let mut cp = Checkpoint::default();
        cp.pending_inputs.insert("n".into(), serde_json::json!(5));
        let restored = CheckpointManager::restore_pending_inputs(&cp, true);
        assert!(matches!(restored.get("n"), Some(Value::Stream(_))));
        let restored = CheckpointManager::restore_pending_inputs(&cp, false);
        assert!(matches!(restored.get("n"), Some(Value::Single(_))));
    }
}
