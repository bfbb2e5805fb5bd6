//! Injected checkpoint storage: opaque bytes in, bytes out.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

/// Persists and retrieves checkpoint bytes by id. The core never inspects
/// the bytes directly — marshalling is the [`super::Codec`]'s job.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>, String>;
    async fn set(&self, id: &str, bytes: Vec<u8>) -> Result<(), String>;
}

/// In-memory store, used for dev/tests, not persistence across process restarts.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>, String> {
        Ok(self.data.lock().expect("checkpoint store lock poisoned").get(id).cloned())
    }

    async fn set(&self, id: &str, bytes: Vec<u8>) -> Result<(), String> {
        self.data
            .lock()
            .expect("checkpoint store lock poisoned")
            .insert(id.to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: get() on an id never set returns None, not an error.
    #[tokio::test]
    async fn get_missing_id_returns_none() {
        let store = InMemoryCheckpointStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    /// **Scenario**: set() then get() round-trips the bytes.
    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = InMemoryCheckpointStore::new();
        store.set("id-1", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("id-1").await.unwrap(), Some(vec![1, 2, 3]));
    }
}
