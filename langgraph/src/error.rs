//! Top-level error taxonomy for graph execution.
//!
//! One variant per error category in the runtime call surface: a node action
//! failing, the Pregel step budget being exhausted, cancellation, a runtime
//! type mismatch at a channel boundary, a missing checkpoint, or a failure
//! from the injected store/codec. `GraphError::Interrupted` is not a failure
//! in the user sense — it carries the [`InterruptInfo`](crate::interrupt::InterruptInfo)
//! the caller needs to resume.

use thiserror::Error;

use crate::interrupt::InterruptInfo;

/// Error produced while compiling, running, checkpointing, or resuming a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node action returned an error; wrapped with the node path that produced it.
    #[error("node {path} failed: {source}")]
    NodeError {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Pregel mode: the iteration count reached the configured `max_steps`.
    #[error("max steps ({0}) exceeded")]
    MaxStepsExceeded(u64),

    /// The caller's cancellation token fired, or a user-interrupt deadline expired
    /// with tasks still in flight.
    #[error("run cancelled: {0}")]
    Cancelled(String),

    /// A declared edge's runtime value did not match its declared `TypeDescriptor`.
    #[error("type mismatch on edge to {to}: expected {expected}, got {actual}")]
    TypeMismatch {
        to: String,
        expected: String,
        actual: String,
    },

    /// `CallOptions::checkpoint_id` named a checkpoint the store does not have.
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// The injected `Codec` failed to marshal or unmarshal a checkpoint.
    #[error("serializer failure: {0}")]
    Serializer(String),

    /// The injected `CheckpointStore` failed a `get`/`set` call.
    #[error("checkpoint store failure: {0}")]
    Store(String),

    /// An edge handler (field mapping / type conversion) raised an error; aborts the iteration.
    #[error("edge handler failed on edge {from}->{to}: {source}")]
    EdgeHandlerFailed {
        from: String,
        to: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A branch predicate raised an error; aborts the iteration.
    #[error("branch evaluator failed on node {0}: {1}")]
    BranchFailed(String, String),

    /// Graph construction was invalid (unknown node id, duplicate channel target, etc.).
    #[error("compilation failed: {0}")]
    Compilation(String),

    /// The run paused; carries the information the caller needs to resume.
    #[error("run interrupted")]
    Interrupted(InterruptInfo),
}

impl GraphError {
    pub fn node<E>(path: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GraphError::NodeError {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn node_msg(path: impl Into<String>, message: impl Into<String>) -> Self {
        GraphError::NodeError {
            path: path.into(),
            source: Box::new(SimpleError(message.into())),
        }
    }
}

/// A string-backed error, used to wrap messages that don't already have an error type
/// (panics recovered at the task boundary, handler failures reported as plain strings).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SimpleError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of NodeError includes the path and the wrapped message.
    #[test]
    fn node_error_display_includes_path_and_message() {
        let err = GraphError::node_msg("a/b", "boom");
        let s = err.to_string();
        assert!(s.contains("a/b"), "{s}");
        assert!(s.contains("boom"), "{s}");
    }

    /// **Scenario**: MaxStepsExceeded carries the configured limit in its Display.
    #[test]
    fn max_steps_exceeded_display_has_count() {
        let err = GraphError::MaxStepsExceeded(25);
        assert!(err.to_string().contains("25"));
    }
}
