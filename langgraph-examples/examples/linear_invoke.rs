//! Minimal linear graph: START -> upper -> exclaim -> END, non-streaming invoke.

use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{CallOptions, CompileOptions, GraphBuilder, NodeAction, NodeFailure, RunContext, Value, END, START};

struct Upper;

#[async_trait]
impl NodeAction for Upper {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        match input {
            Value::Single(serde_json::Value::String(s)) => {
                Ok(Value::Single(serde_json::Value::String(s.to_uppercase())))
            }
            other => Ok(other),
        }
    }
}

struct Exclaim;

#[async_trait]
impl NodeAction for Exclaim {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        match input {
            Value::Single(serde_json::Value::String(s)) => {
                Ok(Value::Single(serde_json::Value::String(format!("{s}!"))))
            }
            other => Ok(other),
        }
    }
}

#[tokio::main]
async fn main() {
    let mut builder = GraphBuilder::new();
    builder.add_node("upper", Arc::new(Upper));
    builder.add_node("exclaim", Arc::new(Exclaim));
    builder.add_edge(START, "upper");
    builder.add_edge("upper", "exclaim");
    builder.add_edge("exclaim", END);

    let graph = builder.compile(CompileOptions::default()).unwrap();
    let output = graph
        .invoke(serde_json::json!("hello"), CallOptions::default())
        .await
        .unwrap();

    println!("{output}");
    assert_eq!(output, serde_json::json!("HELLO!"));
}
