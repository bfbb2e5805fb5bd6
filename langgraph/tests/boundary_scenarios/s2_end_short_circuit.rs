//! S2 - Pregel early-END short-circuit: n1 has two outgoing edges, one to
//! END, one to n2 which also goes to END. Invoke with empty input. Expected:
//! END receives n1's output; n2 is never executed; returned value equals
//! n1's output.

use std::sync::Arc;

use langgraph::{CallOptions, CompileOptions, GraphBuilder, TriggerMode, END, START};

use super::common::NeverCalled;

#[tokio::test]
async fn end_short_circuits_before_sibling_runs_in_same_superstep() {
    let mut builder = GraphBuilder::new();
    builder.add_node("n1", Arc::new(super::common::Constant(serde_json::json!("n1-out"))));
    builder.add_node("n2", Arc::new(NeverCalled));
    builder.add_edge(START, "n1");
    builder.add_edge("n1", END);
    builder.add_edge("n1", "n2");
    builder.add_edge("n2", END);

    let graph = builder
        .compile(CompileOptions {
            trigger_mode: TriggerMode::AnyPredecessor,
            ..Default::default()
        })
        .unwrap();

    let output = graph
        .invoke(serde_json::json!(null), CallOptions::default())
        .await
        .unwrap();

    assert_eq!(output, serde_json::json!("n1-out"));
}
