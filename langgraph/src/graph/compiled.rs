//! Immutable compiled graph and its four call-surface methods: an immutable
//! structure produced by `compile()`, cheap to clone (`Arc`-backed), driving
//! its run loop on demand rather than owning any mutable per-run state itself.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::branch::Branch;
use crate::channel_manager::EdgeHandler;
use crate::error::GraphError;
use crate::graph::node::NodeCall;
use crate::graph::runner::Runner;
use crate::options::{CallOptions, CompileOptions};
use crate::value::{StreamReader, Value};

pub(super) struct GraphInner {
    pub nodes: HashMap<String, NodeCall>,
    pub start_data_successors: HashSet<String>,
    pub start_control_successors: HashSet<String>,
    pub start_branches: Vec<Branch>,
    pub edge_handlers: HashMap<(String, String), Vec<Arc<dyn EdgeHandler>>>,
    pub options: CompileOptions,
}

#[derive(Clone)]
pub struct CompiledGraph(pub(super) Arc<GraphInner>);

impl CompiledGraph {
    pub(super) fn new(
        nodes: HashMap<String, NodeCall>,
        start_data_successors: HashSet<String>,
        start_control_successors: HashSet<String>,
        start_branches: Vec<Branch>,
        edge_handlers: HashMap<(String, String), Vec<Arc<dyn EdgeHandler>>>,
        options: CompileOptions,
    ) -> Self {
        Self(Arc::new(GraphInner {
            nodes,
            start_data_successors,
            start_control_successors,
            start_branches,
            edge_handlers,
            options,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.options.name
    }

    /// Non-streaming input, non-streaming output.
    pub async fn invoke(
        &self,
        input: serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value, GraphError> {
        let output = Runner::run(self.clone(), Value::Single(input), options, false).await?;
        materialize(output).await
    }

    /// Non-streaming input, streaming output.
    pub async fn stream(
        &self,
        input: serde_json::Value,
        options: CallOptions,
    ) -> Result<StreamReader, GraphError> {
        let output = Runner::run(self.clone(), Value::Single(input), options, true).await?;
        Ok(as_stream(output))
    }

    /// Streaming input, non-streaming output.
    pub async fn collect(
        &self,
        input: StreamReader,
        options: CallOptions,
    ) -> Result<serde_json::Value, GraphError> {
        let output = Runner::run(self.clone(), Value::Stream(input), options, false).await?;
        materialize(output).await
    }

    /// Streaming input, streaming output.
    pub async fn transform(
        &self,
        input: StreamReader,
        options: CallOptions,
    ) -> Result<StreamReader, GraphError> {
        let output = Runner::run(self.clone(), Value::Stream(input), options, true).await?;
        Ok(as_stream(output))
    }
}

async fn materialize(value: Value) -> Result<serde_json::Value, GraphError> {
    Ok(match value {
        Value::Single(v) => v,
        Value::Stream(s) => serde_json::Value::Array(s.collect().await),
    })
}

fn as_stream(value: Value) -> StreamReader {
    match value {
        Value::Stream(s) => s,
        Value::Single(v) => StreamReader::from_values(vec![v]),
    }
}
