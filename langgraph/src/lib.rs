//! # langgraph
//!
//! Runtime scheduler and channel fabric for compiled component-orchestration
//! graphs. A graph is built from typed nodes and data/control edges, compiled
//! once into an immutable [`graph::CompiledGraph`], then driven through one of
//! two execution disciplines selected at compile time:
//!
//! - **Pregel-style** (`TriggerMode::AnyPredecessor`): superstep iteration —
//!   a node becomes ready as soon as any declared predecessor has written to
//!   it, and the run is bounded by a configurable step budget.
//! - **DAG-style** (`TriggerMode::AllPredecessor`): eager topological
//!   execution — a node becomes ready only once every declared predecessor
//!   has resolved (written a value, or been skipped by a branch).
//!
//! Both disciplines share the same [`channel_manager::ChannelManager`],
//! [`branch`] evaluation, and [`task_manager::TaskManager`] scheduling; they
//! differ only in which [`channels::Channel`] implementation backs each node
//! and how [`task_manager::TaskManager`] waits for completions.
//!
//! A run can pause mid-flight — at a declared before/after boundary, on a
//! node's rerun request, or on a nested sub-graph's own interrupt — and
//! resume later from a [`checkpoint::Checkpoint`] captured at that point.
//! Checkpoint storage and wire format are both injected collaborators
//! ([`checkpoint::CheckpointStore`], [`checkpoint::Codec`]), so the core
//! stays backend- and format-agnostic.
//!
//! ## Main modules
//!
//! - [`graph`]: [`graph::GraphBuilder`], [`graph::CompiledGraph`], [`graph::NodeAction`] — build and run a graph.
//! - [`channels`]: the per-node input buffer and readiness predicate fabric.
//! - [`channel_manager`]: owns every channel; routes values and branch decisions.
//! - [`branch`]: conditional-edge evaluation and skip propagation.
//! - [`task_manager`]: schedules ready nodes and waits for their completion.
//! - [`checkpoint`]: capture/restore orchestration, storage, and wire format.
//! - [`interrupt`]: the three interrupt signal kinds and `InterruptInfo`.
//! - [`options`]: per-call and compile-time option bundles.
//! - [`value`]: the `Value`/`StreamReader` type-erasure layer nodes trade in.
//! - [`error`]: the `GraphError` taxonomy.
//!
//! ## Features
//!
//! - `tracing`: route internal event logging through the `tracing` crate
//!   instead of `eprintln!`.

pub mod branch;
pub mod channel_manager;
pub mod channels;
pub mod checkpoint;
pub mod error;
pub mod graph;
pub mod interrupt;
pub mod logging;
pub mod options;
pub mod task_manager;
pub mod value;

pub use branch::{Branch, BranchEvaluator, BranchOutcome, BranchPredicate};
pub use channel_manager::{ChannelManager, EdgeHandler, TriggerMode};
pub use channels::{Channel, ChannelSnapshot, DagChannel, MergeConfig, PregelChannel};
pub use checkpoint::{Checkpoint, CheckpointManager, CheckpointStore, Codec, InMemoryCheckpointStore, JsonCodec};
pub use error::{GraphError, SimpleError};
pub use graph::{CompiledGraph, FnNode, GraphBuilder, NodeAction, NodeCall, RunContext, SubGraphNode, END, START};
pub use interrupt::{InterruptBoundaries, InterruptInfo, NodeFailure};
pub use options::{CallOptions, CallbackHandler, CompileOptions, NodePath};
pub use task_manager::{CancelSignal, CompletedTask, PreparedTask, TaskManager, WaitMode, WaitOutcome};
pub use value::{StreamItem, StreamReader, TypeDescriptor, Value};
