//! S4 - Interrupt before node: compile with interrupt-before-nodes = ["n2"];
//! run; expect an interrupt return with InterruptInfo.before_nodes = ["n2"].
//! Resume with the returned checkpoint id; expect completion with the
//! unmodified terminal output.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{
    CallOptions, CompileOptions, GraphBuilder, GraphError, InMemoryCheckpointStore, NodeAction,
    NodeFailure, RunContext, Value, END, START,
};

struct AppendTag(&'static str);

#[async_trait]
impl NodeAction for AppendTag {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        match input {
            Value::Single(serde_json::Value::String(s)) => {
                Ok(Value::Single(serde_json::Value::String(format!("{s}-{}", self.0))))
            }
            other => Ok(other),
        }
    }
}

#[tokio::test]
async fn interrupt_before_then_resume_completes_unchanged() {
    let mut builder = GraphBuilder::new();
    builder.add_node("n1", Arc::new(AppendTag("n1")));
    builder.add_node("n2", Arc::new(AppendTag("n2")));
    builder.add_edge(START, "n1");
    builder.add_edge("n1", "n2");
    builder.add_edge("n2", END);

    let store = Arc::new(InMemoryCheckpointStore::new());
    let graph = builder
        .compile(CompileOptions {
            interrupt_before: HashSet::from(["n2".to_string()]),
            checkpoint_store: Some(store),
            ..Default::default()
        })
        .unwrap();

    let first = graph
        .invoke(
            serde_json::json!("seed"),
            CallOptions {
                write_checkpoint_id: Some("s4".to_string()),
                ..Default::default()
            },
        )
        .await;

    let err = first.expect_err("run must pause before n2");
    match err {
        GraphError::Interrupted(info) => {
            assert_eq!(info.before_nodes, vec!["n2".to_string()]);
        }
        other => panic!("expected Interrupted, got {other:?}"),
    }

    let resumed = graph
        .invoke(
            serde_json::json!("ignored-on-resume"),
            CallOptions {
                checkpoint_id: Some("s4".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("resume completes");

    assert_eq!(resumed, serde_json::json!("seed-n1-n2"));
}
