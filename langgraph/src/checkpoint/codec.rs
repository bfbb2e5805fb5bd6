//! Injected serializer: the core delegates the checkpoint wire format
//! entirely to this trait, so swapping formats never touches capture/restore.

use super::Checkpoint;

/// Marshals/unmarshals a [`Checkpoint`] to/from bytes. Must round-trip the
/// checkpoint record and every registered channel variant.
pub trait Codec: Send + Sync {
    fn marshal(&self, checkpoint: &Checkpoint) -> Result<Vec<u8>, String>;
    fn unmarshal(&self, bytes: &[u8]) -> Result<Checkpoint, String>;
}

/// JSON-based codec, the default. Sub-graph interrupts never go through this
/// codec; they travel in-process as typed `NodeFailure::SubGraphInterrupt` signals.
#[derive(Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn marshal(&self, checkpoint: &Checkpoint) -> Result<Vec<u8>, String> {
        serde_json::to_vec(checkpoint).map_err(|e| e.to_string())
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<Checkpoint, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: marshal then unmarshal reproduces an equivalent checkpoint.
    #[test]
    fn json_codec_roundtrips_checkpoint() {
        let mut cp = Checkpoint::default();
        cp.rerun_nodes.push("n2".into());
        cp.user_state = Some(serde_json::json!({"k": "v"}));

        let codec = JsonCodec;
        let bytes = codec.marshal(&cp).unwrap();
        let restored = codec.unmarshal(&bytes).unwrap();
        assert_eq!(restored.rerun_nodes, cp.rerun_nodes);
        assert_eq!(restored.user_state, cp.user_state);
    }

    /// **Scenario**: invalid bytes on unmarshal return an error, not a panic.
    #[test]
    fn json_codec_invalid_bytes_returns_error() {
        let codec = JsonCodec;
        assert!(codec.unmarshal(b"not json").is_err());
    }
}
