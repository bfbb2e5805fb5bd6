//! Structured event logging for the runner. Every call site is gated on the
//! `tracing` feature, falling back to `eprintln!` so the crate still reports
//! something useful with the feature off.

pub fn log_graph_start(name: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(graph = name, "graph run starting");
    #[cfg(not(feature = "tracing"))]
    eprintln!("[langgraph] graph '{name}' starting");
}

pub fn log_graph_end(name: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(graph = name, "graph run completed");
    #[cfg(not(feature = "tracing"))]
    eprintln!("[langgraph] graph '{name}' completed");
}

pub fn log_graph_error(name: &str, error: &str) {
    #[cfg(feature = "tracing")]
    tracing::error!(graph = name, error, "graph run failed");
    #[cfg(not(feature = "tracing"))]
    eprintln!("[langgraph] graph '{name}' failed: {error}");
}

pub fn log_node_start(node: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(node, "node starting");
    #[cfg(not(feature = "tracing"))]
    eprintln!("[langgraph] node '{node}' starting");
}

pub fn log_node_complete(node: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(node, "node complete");
    #[cfg(not(feature = "tracing"))]
    eprintln!("[langgraph] node '{node}' complete");
}

pub fn log_interrupt(graph: &str, before: usize, after: usize, rerun: usize) {
    #[cfg(feature = "tracing")]
    tracing::info!(graph, before, after, rerun, "run interrupted");
    #[cfg(not(feature = "tracing"))]
    eprintln!("[langgraph] graph '{graph}' interrupted (before={before}, after={after}, rerun={rerun})");
}

pub fn log_checkpoint_persisted(id: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(checkpoint_id = id, "checkpoint persisted");
    #[cfg(not(feature = "tracing"))]
    eprintln!("[langgraph] checkpoint '{id}' persisted");
}
