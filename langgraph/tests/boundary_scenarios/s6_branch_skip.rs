//! S6 - Branch skip propagation: node b branches to {n2, n3} and selects
//! n2; both n2 and n3 independently feed n4. Expect n4 to still execute
//! (its dependency from n2 is satisfied; n3 is marked skipped; the DAG
//! readiness predicate treats skipped predecessors as resolved).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{
    Branch, BranchPredicate, CallOptions, CompileOptions, GraphBuilder, GraphError, NodeAction,
    NodeFailure, RunContext, Value, END, START,
};

use super::common::{Echo, NeverCalled};

struct PickN2;

#[async_trait]
impl BranchPredicate for PickN2 {
    async fn invoke(&self, _value: &serde_json::Value) -> Result<HashSet<String>, GraphError> {
        Ok(["n2".to_string()].into_iter().collect())
    }
}

#[tokio::test]
async fn branch_skip_does_not_block_a_still_live_join() {
    let mut builder = GraphBuilder::new();
    builder.add_node("b", Arc::new(Echo));
    builder.add_node("n2", Arc::new(Echo));
    builder.add_node("n3", Arc::new(NeverCalled));
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

    assert_eq!(output, serde_json::json!("go"));
}
