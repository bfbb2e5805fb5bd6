//! Branch skip propagation: a branch out of `b` selects only `n2`, skipping
//! `n3`. `n4` is declared as a data successor of both, but because a skipped
//! predecessor counts as resolved in DAG mode, `n4` still runs once `n2` reports.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{
    Branch, BranchPredicate, CallOptions, CompileOptions, GraphBuilder, GraphError, NodeAction,
    NodeFailure, RunContext, Value, END, START,
};

struct Echo;

#[async_trait]
impl NodeAction for Echo {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        Ok(input)
    }
}

struct PickN2;

#[async_trait]
impl BranchPredicate for PickN2 {
    async fn invoke(&self, _value: &serde_json::Value) -> Result<HashSet<String>, GraphError> {
        Ok(["n2".to_string()].into_iter().collect())
    }
}

#[tokio::main]
async fn main() {
    let mut builder = GraphBuilder::new();
    builder.add_node("b", Arc::new(Echo));
    builder.add_node("n2", Arc::new(Echo));
    builder.add_node("n3", Arc::new(Echo));
    builder.add_node("n4", Arc::new(Echo));
    builder.add_edge(START, "b");
    builder.add_branch(Branch {
        source: "b".to_string(),
        successors: ["n2".to_string(), "n3".to_string()].into_iter().collect(),
        predicate: Arc::new(PickN2),
        pre_handlers: vec![],
    });
    builder.add_edge("n2", "n4");
    builder.add_edge("n3", "n4");
    builder.add_edge("n4", END);

    let graph = builder.compile(CompileOptions::default()).unwrap();
    let output = graph
        .invoke(serde_json::json!("go"), CallOptions::default())
        .await
        .unwrap();

    println!("{output}");
    assert_eq!(output, serde_json::json!("go"));
}
