//! S5 - Sub-graph interrupt nesting: parent graph has node G wrapping a
//! sub-graph whose node m requests rerun. Expect a top-level interrupt with
//! InterruptInfo.sub_graphs["G"].rerun_nodes containing "m" and with the
//! parent's own state intact. Resume should complete without re-executing
//! any parent predecessor of G.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{
    CallOptions, CompileOptions, GraphBuilder, GraphError, InMemoryCheckpointStore, NodeAction,
    NodeFailure, RunContext, SubGraphNode, Value, END, START,
};

use super::common::CountingEcho;

/// Requests rerun on its first invocation, succeeds on every later one.
struct RerunOnce(Arc<AtomicUsize>);

#[async_trait]
impl NodeAction for RerunOnce {
    async fn call(&self, _input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        let call_count = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        if call_count == 1 {
            Err(NodeFailure::Rerun(None))
        } else {
            Ok(Value::Single(serde_json::json!("done")))
        }
    }
}

fn nested_graph(m_calls: Arc<AtomicUsize>) -> langgraph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("m", Arc::new(RerunOnce(m_calls)));
    builder.add_edge(START, "m");
    builder.add_edge("m", END);
    builder
        .compile(CompileOptions {
            name: "nested".to_string(),
            ..Default::default()
        })
        .unwrap()
}

#[tokio::test]
async fn subgraph_rerun_surfaces_as_nested_interrupt_and_resumes() {
    let pre_calls = Arc::new(AtomicUsize::new(0));
    let m_calls = Arc::new(AtomicUsize::new(0));

    let mut builder = GraphBuilder::new();
    builder.add_node("pre", Arc::new(CountingEcho(pre_calls.clone())));
    builder.add_node("g", Arc::new(SubGraphNode::new(nested_graph(m_calls.clone()))));
    builder.add_edge(START, "pre");
    builder.add_edge("pre", "g");
    builder.add_edge("g", END);

    let store = Arc::new(InMemoryCheckpointStore::new());
    let graph = builder
        .compile(CompileOptions {
            checkpoint_store: Some(store),
            ..Default::default()
        })
        .unwrap();

    let first = graph
        .invoke(
            serde_json::json!("go"),
            CallOptions {
                write_checkpoint_id: Some("s5".to_string()),
                ..Default::default()
            },
        )
        .await;

    let err = first.expect_err("nested rerun must surface as a top-level interrupt");
    match err {
        GraphError::Interrupted(info) => {
            let nested = info.sub_graphs.get("g").expect("nested interrupt under g's key");
            assert_eq!(nested.rerun_nodes, vec!["m".to_string()]);
        }
        other => panic!("expected Interrupted, got {other:?}"),
    }
    assert_eq!(pre_calls.load(Ordering::SeqCst), 1);

    let resumed = graph
        .invoke(
            serde_json::json!("ignored-on-resume"),
            CallOptions {
                checkpoint_id: Some("s5".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("resume completes");

    assert_eq!(resumed, serde_json::json!("done"));
    assert_eq!(pre_calls.load(Ordering::SeqCst), 1, "pre must not re-execute on resume");
    assert_eq!(m_calls.load(Ordering::SeqCst), 2);
}
