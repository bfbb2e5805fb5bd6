//! S1 - Linear three-node non-stream invoke: START -> A -> B -> END, A emits
//! "x", B appends "y". Expected output "xy".

use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{CallOptions, CompileOptions, GraphBuilder, NodeAction, NodeFailure, RunContext, Value, END, START};

struct EmitX;

#[async_trait]
impl NodeAction for EmitX {
    async fn call(&self, _input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        Ok(Value::Single(serde_json::json!("x")))
    }
}

struct AppendY;

#[async_trait]
impl NodeAction for AppendY {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        match input {
            Value::Single(serde_json::Value::String(s)) => {
                Ok(Value::Single(serde_json::Value::String(format!("{s}y"))))
            }
            other => Ok(other),
        }
    }
}

#[tokio::test]
async fn linear_three_node_invoke_produces_xy() {
    let mut builder = GraphBuilder::new();
    builder.add_node("a", Arc::new(EmitX));
    builder.add_node("b", Arc::new(AppendY));
    builder.add_edge(START, "a");
    builder.add_edge("a", "b");
    builder.add_edge("b", END);

    let graph = builder.compile(CompileOptions::default()).unwrap();
    let output = graph
        .invoke(serde_json::json!(null), CallOptions::default())
        .await
        .unwrap();

    assert_eq!(output, serde_json::json!("xy"));
}
