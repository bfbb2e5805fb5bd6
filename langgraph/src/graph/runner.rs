//! Top-level driver: the superstep loop and the full interrupt/checkpoint
//! protocol, shared by all four call-surface methods (`invoke`, `stream`,
//! `collect`, `transform`).
//!
//! The loop itself (`run_loop`) is pure with respect to checkpoint storage:
//! it takes an already-loaded resume `Checkpoint` and returns a `RunOutcome`
//! rather than reaching for a store or converting an interrupt into an error
//! itself. `run` is the store-aware entry point compiled graphs call
//! directly; `run_nested` is the entry point a sub-graph node
//! (`graph::subgraph::SubGraphNode`) uses, which needs the raw `Checkpoint`
//! alongside the `InterruptInfo` to build `NodeFailure::SubGraphInterrupt`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::channel_manager::{ChannelManager, TriggerMode};
use crate::checkpoint::{Checkpoint, CheckpointManager};
use crate::error::GraphError;
use crate::graph::compiled::{CompiledGraph, GraphInner};
use crate::graph::node::{END, START};
use crate::graph::run_context::RunContext;
use crate::interrupt::{InterruptInfo, NodeFailure};
use crate::options::CallOptions;
use crate::task_manager::{CompletedTask, PreparedTask, TaskManager, WaitMode};
use crate::value::Value;

pub struct Runner;

/// Outcome of the pure loop: either the run finished cleanly, or it paused
/// and the caller (store-aware `run`, or a wrapping `SubGraphNode`) decides
/// what to do with the captured checkpoint.
pub enum RunOutcome {
    Done(Value),
    Interrupted(InterruptInfo, Checkpoint),
}

/// A completed node's outcome, bucketed for the protocol's branching logic.
enum Classified {
    Success(String, Value),
    Rerun(String, Option<serde_json::Value>),
    SubGraphInterrupt(String, InterruptInfo, Checkpoint),
}

impl Runner {
    /// Store-aware entry point used by `CompiledGraph`'s four call-surface
    /// methods: loads a resume checkpoint by id when requested, runs the
    /// loop, and on interrupt persists (if a write id was given) before
    /// surfacing `GraphError::Interrupted`.
    pub async fn run(
        graph: CompiledGraph,
        input: Value,
        options: CallOptions,
        streaming_output: bool,
    ) -> Result<Value, GraphError> {
        let inner = &graph.0;
        let checkpoint_mgr = CheckpointManager::new(
            inner.options.checkpoint_store.clone(),
            inner.options.codec.clone(),
        );

        let resume = match options.checkpoint_id.clone().filter(|_| !options.force_new_run) {
            Some(id) => Some(checkpoint_mgr.load(&id).await?),
            None => None,
        };

        // A node action observes external cancellation through `ctx.cancel`
        // (cooperative, per-task) in addition to the iteration-boundary check
        // below; both read the same token so a long-running action and the
        // loop itself agree on whether the run has been cancelled.
        let base_ctx = match &options.cancel {
            Some(cancel) => RunContext::with_cancel(cancel.clone()),
            None => RunContext::top_level(),
        };

        let outcome = run_loop(
            inner,
            &checkpoint_mgr,
            input,
            &options,
            streaming_output,
            resume,
            Arc::new(base_ctx),
        )
        .await?;

        match outcome {
            RunOutcome::Done(value) => Ok(value),
            RunOutcome::Interrupted(info, checkpoint) => {
                if let Some(write_id) = &options.write_checkpoint_id {
                    checkpoint_mgr.persist(write_id, &checkpoint).await?;
                    crate::logging::log_checkpoint_persisted(write_id);
                }
                Err(GraphError::Interrupted(info))
            }
        }
    }

    /// Entry point for a sub-graph node's nested run (`graph::subgraph::SubGraphNode`).
    /// Unlike `run`, the resume checkpoint is handed down directly by the
    /// caller (restored from the parent's `Checkpoint::sub_graphs`, carried
    /// in `ctx.resume_checkpoint`) rather than looked up by id, and an
    /// interrupt is returned as `RunOutcome::Interrupted` instead of being
    /// converted into `GraphError` — the wrapper needs the `Checkpoint` to
    /// nest it back under its own key.
    pub async fn run_nested(
        graph: CompiledGraph,
        input: Value,
        options: CallOptions,
        streaming_output: bool,
        resume: Option<Checkpoint>,
        ctx: Arc<RunContext>,
    ) -> Result<RunOutcome, GraphError> {
        let inner = &graph.0;
        let checkpoint_mgr = CheckpointManager::new(
            inner.options.checkpoint_store.clone(),
            inner.options.codec.clone(),
        );
        run_loop(inner, &checkpoint_mgr, input, &options, streaming_output, resume, ctx).await
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    inner: &GraphInner,
    checkpoint_mgr: &CheckpointManager,
    input: Value,
    options: &CallOptions,
    streaming_output: bool,
    resume: Option<Checkpoint>,
    base_ctx: Arc<RunContext>,
) -> Result<RunOutcome, GraphError> {
    let mode = match inner.options.trigger_mode {
        TriggerMode::AnyPredecessor => WaitMode::WaitAny,
        TriggerMode::AllPredecessor => WaitMode::WaitAll,
    };
    let mut channels = ChannelManager::new(inner.options.trigger_mode);
    declare_all_channels(&mut channels, inner);
    for (node, cfg) in &inner.options.merge_configs {
        channels.set_merge_config(node.clone(), *cfg);
    }
    for ((from, to), handlers) in &inner.edge_handlers {
        channels.set_edge_handlers(from.clone(), to.clone(), handlers.clone());
    }

    let mut tasks = TaskManager::new(mode, inner.options.eager_execution_disabled);

    let is_streaming_run = streaming_output || matches!(&input, Value::Stream(_));

    let mut next_tasks: HashMap<String, Value>;
    let mut user_state: Option<serde_json::Value> = None;
    let mut skip_pre_handler: HashSet<String> = HashSet::new();
    // Per-node resume material restored from a checkpoint, consumed (removed)
    // as each task is built so a later superstep never replays it.
    let mut resume_sub_graphs: HashMap<String, Checkpoint> = HashMap::new();
    let mut resume_executed_tools: HashMap<String, Vec<String>> = HashMap::new();
    // Nodes whose pending input came straight from a restored checkpoint
    // rather than from routing a completion this run. A node lands in
    // `pending_inputs` precisely when it was about to run at capture time —
    // including one that was itself the reason for an interrupt-before pause
    // — so re-checking it against `interrupt_before` on the very next
    // superstep would just reproduce the same interrupt forever. Exempted
    // for one superstep only; cleared right after that check below.
    let mut just_resumed: HashSet<String> = HashSet::new();

    if let Some(checkpoint) = resume {
        channels.load_channels(checkpoint.channels.clone());
        user_state = checkpoint.user_state.clone();
        if let Some(modifier) = &options.state_modifier {
            if let Some(state) = user_state.take() {
                user_state = Some(modifier(state));
            }
        }
        skip_pre_handler = checkpoint.skip_pre_handler.clone();
        resume_sub_graphs = checkpoint.sub_graphs.clone();
        resume_executed_tools = checkpoint.executed_tools.clone();
        let mut resumed = CheckpointManager::restore_pending_inputs(&checkpoint, is_streaming_run);
        for node in &checkpoint.rerun_nodes {
            resumed
                .entry(node.clone())
                .or_insert_with(|| CheckpointManager::rerun_seed_value(is_streaming_run));
        }
        just_resumed = resumed.keys().cloned().collect();
        next_tasks = resumed;
    } else {
        next_tasks = route_completion(
            &mut channels,
            START,
            input,
            &inner.start_data_successors,
            &inner.start_control_successors,
            &inner.start_branches,
        )
        .await?;
    }

    crate::logging::log_graph_start(&inner.options.name);
    for cb in &options.callbacks {
        cb.on_graph_start(&inner.options.name);
    }

    let mut step: u64 = 0;
    let max_steps = options.max_steps.unwrap_or(inner.options.max_steps);

    loop {
        // External cancellation is checked first, ahead of even the END
        // short-circuit. Draining is bounded by the same token's deadline,
        // if it has one; the run then always returns `Cancelled`, never an
        // interrupt.
        if let Some(cancel) = &options.cancel {
            if cancel.is_cancelled() {
                let mut bound = cancel.clone();
                while tasks.in_flight_count() > 0 {
                    let drained = tasks.wait(Some(&mut bound)).await;
                    if drained.cancelled {
                        break;
                    }
                }
                for cb in &options.callbacks {
                    cb.on_graph_error(&inner.options.name, "cancelled");
                }
                return Err(GraphError::Cancelled("external cancellation requested".to_string()));
            }
        }

        if inner.options.trigger_mode == TriggerMode::AnyPredecessor && step >= max_steps {
            crate::logging::log_graph_error(&inner.options.name, "max steps exceeded");
            for cb in &options.callbacks {
                cb.on_graph_error(&inner.options.name, "max steps exceeded");
            }
            return Err(GraphError::MaxStepsExceeded(max_steps));
        }
        step += 1;

        // END short-circuits before anything else in this wavefront runs,
        // even a sibling that became ready in the very same superstep
        // (interrupt-before does not take precedence here).
        if let Some(end_value) = next_tasks.remove(END) {
            crate::logging::log_graph_end(&inner.options.name);
            for cb in &options.callbacks {
                cb.on_graph_end(&inner.options.name);
            }
            return Ok(RunOutcome::Done(end_value));
        }

        let before_hits: Vec<String> = next_tasks
            .keys()
            .filter(|k| inner.options.interrupt_before.contains(*k) && !just_resumed.contains(*k))
            .cloned()
            .collect();
        // The exemption only covers the superstep immediately following a
        // resume; every later superstep checks `interrupt_before` normally.
        just_resumed.clear();
        if !before_hits.is_empty() {
            let info = InterruptInfo {
                state: user_state.clone(),
                before_nodes: before_hits,
                ..Default::default()
            };
            return build_interrupt(
                &inner.options.name,
                checkpoint_mgr,
                &channels,
                options,
                next_tasks,
                HashMap::new(),
                info,
            )
            .await;
        }

        let mut prepared: Vec<PreparedTask> = Vec::with_capacity(next_tasks.len());
        for (node, value) in next_tasks.drain() {
            let call = &inner.nodes[&node];
            // A node opted into type-checked conversions gets its input
            // validated against the declared edge type before it ever
            // reaches the node action.
            if call.type_checked {
                value.assert_type(&node, &call.input_type)?;
            }
            let pre_handler = if skip_pre_handler.remove(&node) {
                None
            } else {
                call.pre_handler.clone()
            };
            let resume_checkpoint = resume_sub_graphs.remove(&node).map(Arc::new);
            let executed_tools = resume_executed_tools.remove(&node).unwrap_or_default();
            let ctx = Arc::new(base_ctx.for_task(resume_checkpoint, executed_tools));
            prepared.push(PreparedTask {
                node,
                action: call.action.clone(),
                input: value,
                pre_handler,
                post_handler: call.post_handler.clone(),
                ctx,
            });
        }

        for t in &prepared {
            crate::logging::log_node_start(&t.node);
        }
        for cb in &options.callbacks {
            for t in &prepared {
                cb.on_node_start(&t.node);
            }
        }

        let mut interrupt_signal = options.interrupt_signal.clone();
        let mut completed = tasks.submit(prepared).await;
        let outcome = tasks.wait(interrupt_signal.as_mut()).await;
        completed.extend(outcome.completed);
        // Tasks still in flight at a user-interrupt deadline never get
        // observed as completions, so they can't go through `classify`;
        // fold them straight into the rerun list.
        let deadline_cancelled: Vec<String> = outcome.cancelled_nodes;

        for t in &completed {
            if t.outcome.is_ok() {
                crate::logging::log_node_complete(&t.node);
            }
        }
        for cb in &options.callbacks {
            for t in &completed {
                if t.outcome.is_ok() {
                    cb.on_node_complete(&t.node);
                }
            }
        }

        let (classified, hard_errors) = classify(completed);
        if let Some((node, err)) = hard_errors.into_iter().next() {
            for cb in &options.callbacks {
                cb.on_graph_error(&inner.options.name, &err.to_string());
            }
            return Err(GraphError::NodeError {
                path: node,
                source: err,
            });
        }

        let after_hits: Vec<String> = classified
            .iter()
            .filter_map(|c| match c {
                Classified::Success(node, _) if inner.options.interrupt_after.contains(node) => {
                    Some(node.clone())
                }
                _ => None,
            })
            .collect();

        let mut reruns: Vec<(String, Option<serde_json::Value>)> = deadline_cancelled
            .into_iter()
            .map(|node| (node, None))
            .collect();
        let mut sub_graph_interrupts = Vec::new();
        let mut successes = Vec::new();
        for c in classified {
            match c {
                Classified::Success(node, value) => successes.push((node, value)),
                Classified::Rerun(node, extra) => reruns.push((node, extra)),
                Classified::SubGraphInterrupt(node, info, cp) => {
                    sub_graph_interrupts.push((node, info, cp))
                }
            }
        }

        if !after_hits.is_empty() || !reruns.is_empty() || !sub_graph_interrupts.is_empty() {
            while tasks.in_flight_count() > 0 {
                let drained = tasks.wait(interrupt_signal.as_mut()).await;
                reruns.extend(drained.cancelled_nodes.into_iter().map(|n| (n, None)));
                let (more_classified, more_errors) = classify(drained.completed);
                if let Some((node, err)) = more_errors.into_iter().next() {
                    return Err(GraphError::NodeError { path: node, source: err });
                }
                for c in more_classified {
                    match c {
                        Classified::Success(node, value) => successes.push((node, value)),
                        Classified::Rerun(node, extra) => reruns.push((node, extra)),
                        Classified::SubGraphInterrupt(node, info, cp) => {
                            sub_graph_interrupts.push((node, info, cp))
                        }
                    }
                }
                if drained.cancelled {
                    break;
                }
            }

            let pending = route_all(&mut channels, inner, successes).await?;

            let mut rerun_nodes: Vec<String> = reruns.iter().map(|(n, _)| n.clone()).collect();
            let mut rerun_extra = HashMap::new();
            for (node, extra) in &reruns {
                if let Some(e) = extra {
                    rerun_extra.insert(node.clone(), e.clone());
                }
            }
            let mut sub_graphs_info = HashMap::new();
            let mut sub_graphs_checkpoint = HashMap::new();
            for (node, info, cp) in sub_graph_interrupts {
                rerun_nodes.push(node.clone());
                sub_graphs_info.insert(node.clone(), info);
                sub_graphs_checkpoint.insert(node, cp);
            }

            let info = InterruptInfo {
                state: user_state.clone(),
                after_nodes: after_hits,
                rerun_nodes,
                rerun_extra,
                sub_graphs: sub_graphs_info,
            };
            return build_interrupt(
                &inner.options.name,
                checkpoint_mgr,
                &channels,
                options,
                pending,
                sub_graphs_checkpoint,
                info,
            )
            .await;
        }

        next_tasks = route_all(&mut channels, inner, successes).await?;
    }
}

fn declare_all_channels(channels: &mut ChannelManager, inner: &GraphInner) {
    let mut data_preds: HashMap<String, HashSet<String>> = HashMap::new();
    let mut control_preds: HashMap<String, HashSet<String>> = HashMap::new();

    for succ in &inner.start_data_successors {
        data_preds.entry(succ.clone()).or_default().insert(START.to_string());
    }
    for succ in &inner.start_control_successors {
        control_preds.entry(succ.clone()).or_default().insert(START.to_string());
    }
    for node in inner.nodes.values() {
        for succ in &node.data_successors {
            data_preds.entry(succ.clone()).or_default().insert(node.key.clone());
        }
        for succ in &node.control_successors {
            control_preds.entry(succ.clone()).or_default().insert(node.key.clone());
        }
    }

    let mut all_keys: HashSet<String> = inner.nodes.keys().cloned().collect();
    all_keys.insert(END.to_string());

    for key in all_keys {
        let d = data_preds.remove(&key).unwrap_or_default();
        let c = control_preds.remove(&key).unwrap_or_default();
        channels.declare_node(key, d, c);
    }
}

/// Routes one node's output (or START's input) through its declared data/control
/// successors and branches, returning the resulting ready map.
async fn route_completion(
    channels: &mut ChannelManager,
    source: &str,
    value: Value,
    data_successors: &HashSet<String>,
    control_successors: &HashSet<String>,
    branches: &[crate::branch::Branch],
) -> Result<HashMap<String, Value>, GraphError> {
    let branch_targets: HashSet<String> = branches.iter().flat_map(|b| b.successors.iter().cloned()).collect();
    let plain_targets: HashSet<String> = data_successors.difference(&branch_targets).cloned().collect();

    let mut values = Vec::new();
    for target in &plain_targets {
        values.push((target.clone(), source.to_string(), clone_value(&value)));
    }
    if !branches.is_empty() {
        let selected = channels.route_branches(source, branches, &value).await?;
        for target in selected {
            values.push((target, source.to_string(), clone_value(&value)));
        }
    }
    let deps: Vec<(String, Vec<String>)> = control_successors
        .iter()
        .map(|c| (c.clone(), vec![source.to_string()]))
        .collect();

    channels.update_and_get(values, deps).await
}

async fn route_all(
    channels: &mut ChannelManager,
    inner: &GraphInner,
    successes: Vec<(String, Value)>,
) -> Result<HashMap<String, Value>, GraphError> {
    let mut ready = HashMap::new();
    for (node, value) in successes {
        let call = &inner.nodes[&node];
        let next = route_completion(
            channels,
            &node,
            value,
            &call.data_successors,
            &call.control_successors,
            &call.branches,
        )
        .await?;
        ready.extend(next);
    }
    Ok(ready)
}

fn clone_value(value: &Value) -> Value {
    match value {
        Value::Single(v) => Value::Single(v.clone()),
        Value::Stream(s) => Value::Stream(s.clone()),
    }
}

type HardErrors = Vec<(String, Box<dyn std::error::Error + Send + Sync>)>;

fn classify(completed: Vec<CompletedTask>) -> (Vec<Classified>, HardErrors) {
    let mut classified = Vec::new();
    let mut errors = Vec::new();
    for task in completed {
        match task.outcome {
            Ok(value) => classified.push(Classified::Success(task.node, value)),
            Err(NodeFailure::Error(e)) => errors.push((task.node, e)),
            Err(NodeFailure::Rerun(extra)) => classified.push(Classified::Rerun(task.node, extra)),
            Err(NodeFailure::SubGraphInterrupt(info, cp)) => {
                classified.push(Classified::SubGraphInterrupt(task.node, *info, *cp))
            }
        }
    }
    (classified, errors)
}

/// Captures a checkpoint from the current run state and packages it with its
/// `InterruptInfo` as a `RunOutcome::Interrupted`. Checkpoints are only ever
/// built along this path, never on a clean completion — the actual store
/// write happens in `Runner::run`, since a nested run via `Runner::run_nested`
/// may not want to persist at all.
async fn build_interrupt(
    graph_name: &str,
    checkpoint_mgr: &CheckpointManager,
    channels: &ChannelManager,
    options: &CallOptions,
    pending: HashMap<String, Value>,
    sub_graphs: HashMap<String, Checkpoint>,
    info: InterruptInfo,
) -> Result<RunOutcome, GraphError> {
    let skip_pre_handler: HashSet<String> = pending.keys().cloned().collect();
    let rerun_nodes = info.rerun_nodes.clone();
    crate::logging::log_interrupt(
        graph_name,
        info.before_nodes.len(),
        info.after_nodes.len(),
        rerun_nodes.len(),
    );
    let executed_tools = extract_executed_tools(&info.rerun_extra);
    let checkpoint = checkpoint_mgr
        .capture(
            channels.snapshot_channels(),
            pending,
            info.state.clone(),
            skip_pre_handler,
            rerun_nodes,
            executed_tools,
            sub_graphs,
        )
        .await;

    for cb in &options.callbacks {
        cb.on_graph_end("interrupted");
    }
    Ok(RunOutcome::Interrupted(info, checkpoint))
}

/// Pulls a per-node executed-tools list out of a rerun node's extra payload,
/// when that payload is a JSON array of strings.
fn extract_executed_tools(
    rerun_extra: &HashMap<String, serde_json::Value>,
) -> HashMap<String, Vec<String>> {
    let mut out = HashMap::new();
    for (node, extra) in rerun_extra {
        if let serde_json::Value::Array(items) = extra {
            let tools: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if !tools.is_empty() {
                out.insert(node.clone(), tools);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::graph::builder::GraphBuilder;
    use crate::graph::node::{FnNode, END, START};
    use crate::interrupt::NodeFailure;
    use crate::options::{CallOptions, CompileOptions};
    use crate::task_manager::CancelSignal;
    use crate::value::Value;

    /// **Scenario**: a pre-fired external cancellation token short-circuits
    /// the run with `Cancelled` rather than running any node.
    #[tokio::test]
    async fn pre_fired_external_cancel_returns_cancelled() {
        let mut b = GraphBuilder::new();
        b.add_node(
            "a",
            std::sync::Arc::new(FnNode(|v: Value| async move { Ok(v) })),
        );
        b.add_edge(START, "a");
        b.add_edge("a", END);
        let graph = b.compile(CompileOptions::default()).unwrap();

        let (tx, rx) = tokio::sync::watch::channel(false);
        tx.send(true).unwrap();

        let result = graph
            .invoke(
                serde_json::json!("x"),
                CallOptions {
                    cancel: Some(CancelSignal::new(rx)),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(crate::error::GraphError::Cancelled(_))));
    }

    /// A node slow enough that `wait`'s deadline race always resolves to the
    /// timeout branch before it finishes.
    struct Slow;

    #[async_trait]
    impl crate::graph::node::NodeAction for Slow {
        async fn call(
            &self,
            _input: Value,
            _ctx: &crate::graph::run_context::RunContext,
        ) -> Result<Value, NodeFailure> {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Ok(Value::Single(serde_json::json!("done")))
        }
    }

    /// **Scenario**: a node still in flight when a user-interrupt deadline
    /// expires becomes a rerun candidate, and the run returns an interrupt
    /// rather than its result.
    #[tokio::test]
    async fn user_interrupt_deadline_turns_in_flight_node_into_rerun() {
        let mut b = GraphBuilder::new();
        b.add_node("a", std::sync::Arc::new(Slow));
        b.add_edge(START, "a");
        b.add_edge("a", END);
        let graph = b
            .compile(CompileOptions {
                eager_execution_disabled: true,
                ..Default::default()
            })
            .unwrap();

        let (_tx, rx) = tokio::sync::watch::channel(false);
        // Already-elapsed deadline: guarantees the race resolves to the
        // timeout branch the first time `wait` polls it, regardless of how
        // long graph construction above took.
        let signal = CancelSignal::with_deadline(rx, tokio::time::Instant::now());

        let result = graph
            .invoke(
                serde_json::json!("x"),
                CallOptions {
                    interrupt_signal: Some(signal),
                    ..Default::default()
                },
            )
            .await;

        match result {
            Err(crate::error::GraphError::Interrupted(info)) => {
                assert_eq!(info.rerun_nodes, vec!["a".to_string()]);
            }
            other => panic!("expected an interrupt with 'a' as a rerun node, got {other:?}"),
        }
    }

    /// **Scenario**: a node declaring a `number` input type rejects a string
    /// value routed to it with `TypeMismatch` instead of running the action.
    #[tokio::test]
    async fn type_checked_node_rejects_mismatched_input() {
        let mut b = GraphBuilder::new();
        b.add_node(
            "a",
            std::sync::Arc::new(FnNode(|v: Value| async move { Ok(v) })),
        );
        b.add_edge(START, "a");
        b.add_edge("a", END);
        b.with_input_type("a", crate::value::TypeDescriptor::new("number"));
        let graph = b.compile(CompileOptions::default()).unwrap();

        let result = graph.invoke(serde_json::json!("not a number"), CallOptions::default()).await;

        assert!(matches!(
            result,
            Err(crate::error::GraphError::TypeMismatch { .. })
        ));
    }

    /// A node that reports whether it observed the external cancel token as
    /// already fired through its own `ctx.cancel`, rather than through the
    /// loop's iteration-boundary check.
    struct ObservesCancel;

    #[async_trait]
    impl crate::graph::node::NodeAction for ObservesCancel {
        async fn call(
            &self,
            _input: Value,
            ctx: &crate::graph::run_context::RunContext,
        ) -> Result<Value, NodeFailure> {
            Ok(Value::Single(serde_json::json!(ctx.cancel.is_cancelled())))
        }
    }

    /// **Scenario**: `CallOptions::cancel` seeds the top-level `RunContext`,
    /// so a node action that cooperatively checks `ctx.cancel` sees the same
    /// token the run loop itself checks at every iteration boundary.
    #[tokio::test]
    async fn call_options_cancel_is_visible_to_node_actions_via_context() {
        let mut b = GraphBuilder::new();
        b.add_node("a", std::sync::Arc::new(ObservesCancel));
        b.add_edge(START, "a");
        b.add_edge("a", END);
        let graph = b.compile(CompileOptions::default()).unwrap();

        let (_tx, rx) = tokio::sync::watch::channel(false);
        let result = graph
            .invoke(
                serde_json::json!("x"),
                CallOptions {
                    cancel: Some(CancelSignal::new(rx)),
                    ..Default::default()
                },
            )
            .await
            .expect("not yet cancelled, node runs normally");
        assert_eq!(result, serde_json::json!(false));
    }
}
