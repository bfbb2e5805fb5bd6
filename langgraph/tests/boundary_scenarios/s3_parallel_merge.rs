//! S3 - Parallel merge: three branches from START feed three template
//! nodes, each picks a different key from the input map and emits a
//! message. The END output is a map keyed the same way, each value a
//! single-element list holding that branch's message.

use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{CallOptions, CompileOptions, GraphBuilder, NodeAction, NodeFailure, RunContext, Value, END, START};

struct TemplateNode {
    key: &'static str,
    var: &'static str,
}

#[async_trait]
impl NodeAction for TemplateNode {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        let Value::Single(root) = input else {
            return Ok(Value::Single(serde_json::json!({})));
        };
        let value = root
            .get(self.key)
            .and_then(|v| v.get(self.var))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let message = format!("msg:{value}");
        Ok(Value::Single(serde_json::json!({ self.key: [message] })))
    }
}

#[tokio::test]
async fn three_way_parallel_merge_produces_keyed_map() {
    let mut builder = GraphBuilder::new();
    builder.add_node("t1", Arc::new(TemplateNode { key: "1", var: "var1" }));
    builder.add_node("t2", Arc::new(TemplateNode { key: "2", var: "var2" }));
    builder.add_node("t3", Arc::new(TemplateNode { key: "3", var: "var3" }));
    builder.add_edge(START, "t1");
    builder.add_edge(START, "t2");
    builder.add_edge(START, "t3");
    builder.add_edge("t1", END);
    builder.add_edge("t2", END);
    builder.add_edge("t3", END);

    let graph = builder.compile(CompileOptions::default()).unwrap();
    let input = serde_json::json!({
        "1": {"var1": "a"},
        "2": {"var2": "b"},
        "3": {"var3": "c"},
    });
    let output = graph.invoke(input, CallOptions::default()).await.unwrap();

    assert_eq!(
        output,
        serde_json::json!({
            "1": ["msg:a"],
            "2": ["msg:b"],
            "3": ["msg:c"],
        })
    );
}
