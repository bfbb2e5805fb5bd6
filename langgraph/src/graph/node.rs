//! Per-node executable unit.
//!
//! A node action is generalized from "state in, state out" to the
//! [`Value`]-typed action the channel fabric actually trades in, so a single
//! node can sit in either a streaming or non-streaming run.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::branch::Branch;
use crate::channel_manager::EdgeHandler;
use crate::interrupt::NodeFailure;
use crate::graph::run_context::RunContext;
use crate::value::{TypeDescriptor, Value};

/// Sentinel for graph entry: the implicit predecessor of every node reachable
/// directly from the caller's input.
pub const START: &str = "__start__";

/// Sentinel for graph exit: the node whose input becomes the run's output.
pub const END: &str = "__end__";

/// The executable action behind a node. Node actions trade in [`Value`], so a
/// single `call` serves both the streaming and non-streaming entry points —
/// a streaming caller passes/expects `Value::Stream`, a non-streaming one
/// `Value::Single`.
#[async_trait]
pub trait NodeAction: Send + Sync {
    async fn call(&self, input: Value, ctx: &RunContext) -> Result<Value, NodeFailure>;
}

/// Adapts any `Fn(Value) -> Result<Value, NodeFailure>`-shaped async closure
/// into a `NodeAction`, for building small example/test graphs without a
/// dedicated type per node.
pub struct FnNode<F>(pub F);

#[async_trait]
impl<F, Fut> NodeAction for FnNode<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value, NodeFailure>> + Send,
{
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        (self.0)(input).await
    }
}

/// Immutable per-node compiled record: the action plus its declared
/// topology. Produced by [`super::builder::GraphBuilder::compile`]; never
/// mutated after.
pub struct NodeCall {
    pub key: String,
    pub action: Arc<dyn NodeAction>,
    pub data_successors: HashSet<String>,
    pub control_successors: HashSet<String>,
    pub branches: Vec<Branch>,
    pub pre_handler: Option<Arc<dyn EdgeHandler>>,
    pub post_handler: Option<Arc<dyn EdgeHandler>>,
    /// Whether this node participates in type-checked runtime conversions;
    /// `false` opts out via `TypeDescriptor::ANY`.
    pub type_checked: bool,
    pub input_type: TypeDescriptor,
    pub output_type: TypeDescriptor,
}

impl NodeCall {
    pub fn data_predecessors_of(nodes: &[NodeCall], target: &str) -> HashSet<String> {
        nodes
            .iter()
            .filter(|n| n.data_successors.contains(target))
            .map(|n| n.key.clone())
            .collect()
    }

    pub fn control_predecessors_of(nodes: &[NodeCall], target: &str) -> HashSet<String> {
        nodes
            .iter()
            .filter(|n| n.control_successors.contains(target))
            .map(|n| n.key.clone())
            .collect()
    }
}
