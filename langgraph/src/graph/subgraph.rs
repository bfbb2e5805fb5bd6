//! Wraps a compiled graph as a single node action, so a sub-graph composes
//! into a parent graph exactly like any other node. Reuses the same nested
//! entry point (`Runner::run_nested`) a top-level `invoke`/`stream` call
//! would otherwise drive.

use async_trait::async_trait;

use crate::graph::compiled::CompiledGraph;
use crate::graph::node::NodeAction;
use crate::graph::run_context::RunContext;
use crate::graph::runner::{RunOutcome, Runner};
use crate::interrupt::NodeFailure;
use crate::options::CallOptions;
use crate::value::Value;

/// A node whose action is itself a compiled graph. On resume, the parent's
/// `ctx.resume_checkpoint` (restored from its own `Checkpoint::sub_graphs`
/// entry for this node's key) seeds the nested run; a nested interrupt is
/// reported back up as `NodeFailure::SubGraphInterrupt` rather than
/// `GraphError`, so the parent's run loop can fold it into its own
/// `InterruptInfo` and checkpoint instead of letting it escape to the
/// top-level caller.
pub struct SubGraphNode {
    graph: CompiledGraph,
}

impl SubGraphNode {
    pub fn new(graph: CompiledGraph) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl NodeAction for SubGraphNode {
    async fn call(&self, input: Value, ctx: &RunContext) -> Result<Value, NodeFailure> {
        let resume = ctx.resume_checkpoint.as_ref().map(|cp| (**cp).clone());
        let streaming_output = matches!(&input, Value::Stream(_));
        let nested_ctx = std::sync::Arc::new(ctx.descend(self.graph.name(), None));

        // Forward the parent's cancellation token so the nested run's own
        // iteration-boundary check (`graph::runner::run_loop`) sees an
        // external cancel without waiting for a node action inside it to
        // consult `ctx.cancel` itself.
        let nested_options = CallOptions {
            cancel: Some(ctx.cancel.clone()),
            ..Default::default()
        };

        let outcome = Runner::run_nested(
            self.graph.clone(),
            input,
            nested_options,
            streaming_output,
            resume,
            nested_ctx,
        )
        .await
        .map_err(|e| NodeFailure::Error(Box::new(e)))?;

        match outcome {
            RunOutcome::Done(value) => Ok(value),
            RunOutcome::Interrupted(info, checkpoint) => {
                Err(NodeFailure::SubGraphInterrupt(Box::new(info), Box::new(checkpoint)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::GraphBuilder;
    use crate::graph::node::{FnNode, END, START};
    use crate::options::CompileOptions;

    fn doubling_graph() -> CompiledGraph {
        use crate::value::Value as NodeValue;
        let mut builder = GraphBuilder::new();
        builder.add_node(
            "double",
            std::sync::Arc::new(FnNode(|input: NodeValue| async move {
                let n = match input {
                    NodeValue::Single(v) => v.as_i64().unwrap_or(0),
                    NodeValue::Stream(_) => 0,
                };
                Ok(NodeValue::Single(serde_json::json!(n * 2)))
            })),
        );
        builder.add_edge(START, "double");
        builder.add_edge("double", END);
        builder
            .compile(CompileOptions {
                name: "nested".to_string(),
                ..Default::default()
            })
            .expect("compiles")
    }

    /// **Scenario**: a clean nested run returns its value as the wrapping node's own output.
    #[tokio::test]
    async fn nested_clean_run_returns_value() {
        let node = SubGraphNode::new(doubling_graph());
        let ctx = RunContext::top_level();
        let out = node
            .call(Value::Single(serde_json::json!(21)), &ctx)
            .await
            .expect("nested run succeeds");
        match out {
            Value::Single(v) => assert_eq!(v, serde_json::json!(42)),
            Value::Stream(_) => panic!("expected single value"),
        }
    }
}
