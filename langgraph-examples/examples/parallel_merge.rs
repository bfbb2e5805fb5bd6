//! DAG-mode diamond: START fans out to two nodes, whose object outputs are
//! merged into one input at the join node before reaching END.

use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{CallOptions, CompileOptions, GraphBuilder, NodeAction, NodeFailure, RunContext, Value, END, START};

struct Constant(serde_json::Value);

#[async_trait]
impl NodeAction for Constant {
    async fn call(&self, _input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        Ok(Value::Single(self.0.clone()))
    }
}

struct Echo;

#[async_trait]
impl NodeAction for Echo {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        Ok(input)
    }
}

#[tokio::main]
async fn main() {
    let mut builder = GraphBuilder::new();
    builder.add_node("a", Arc::new(Constant(serde_json::json!({"a": 1}))));
    builder.add_node("b", Arc::new(Constant(serde_json::json!({"b": 2}))));
    builder.add_node("merge", Arc::new(Echo));
    builder.add_edge(START, "a");
    builder.add_edge(START, "b");
    builder.add_edge("a", "merge");
    builder.add_edge("b", "merge");
    builder.add_edge("merge", END);

    // DAG discipline is the default trigger mode; "merge" waits for both "a"
    // and "b" before its channel reports ready.
    let graph = builder.compile(CompileOptions::default()).unwrap();
    let output = graph
        .invoke(serde_json::json!(null), CallOptions::default())
        .await
        .unwrap();

    println!("{output}");
    assert_eq!(output, serde_json::json!({"a": 1, "b": 2}));
}
