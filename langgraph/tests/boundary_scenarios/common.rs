//! Shared node actions for the boundary-scenario tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{NodeAction, NodeFailure, RunContext, Value};

/// Passes its input through unchanged.
pub struct Echo;

#[async_trait]
impl NodeAction for Echo {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        Ok(input)
    }
}

/// Ignores its input and always emits the same constant.
pub struct Constant(pub serde_json::Value);

#[async_trait]
impl NodeAction for Constant {
    async fn call(&self, _input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        Ok(Value::Single(self.0.clone()))
    }
}

/// Counts how many times it has been called, for asserting a node does or
/// does not re-execute across a checkpoint resume.
pub struct CountingEcho(pub Arc<AtomicUsize>);

#[async_trait]
impl NodeAction for CountingEcho {
    async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(input)
    }
}

/// Fails with a hard panic if ever called; used to assert a node is skipped
/// by the scheduler rather than merely unreachable.
pub struct NeverCalled;

#[async_trait]
impl NodeAction for NeverCalled {
    async fn call(&self, _input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
        panic!("this node must never execute");
    }
}
