//! Graph construction and execution: node actions, the builder, the compiled
//! immutable graph, per-run context, and the runner that drives it.

mod builder;
mod compiled;
mod node;
mod run_context;
mod runner;
mod subgraph;

pub use builder::GraphBuilder;
pub use compiled::CompiledGraph;
pub use node::{FnNode, NodeAction, NodeCall, END, START};
pub use run_context::RunContext;
pub use subgraph::SubGraphNode;
