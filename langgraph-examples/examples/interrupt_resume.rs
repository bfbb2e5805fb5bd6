//! Interrupt-before example: compiles a two-node chain with an
//! interrupt-before boundary on the second node, runs to the pause point,
//! then resumes from the persisted checkpoint to completion.

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

#[tokio::main]
async fn main() {
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

    let paused = graph
        .invoke(
            serde_json::json!("seed"),
            CallOptions {
                write_checkpoint_id: Some("demo".to_string()),
                ..Default::default()
            },
        )
        .await;

    match paused {
        Err(GraphError::Interrupted(info)) => {
            println!("paused before: {:?}", info.before_nodes);
        }
        other => panic!("expected an interrupt, got {other:?}"),
    }

    let output = graph
        .invoke(
            serde_json::json!("ignored-on-resume"),
            CallOptions {
                checkpoint_id: Some("demo".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    println!("{output}");
    assert_eq!(output, serde_json::json!("seed-n1-n2"));
}
