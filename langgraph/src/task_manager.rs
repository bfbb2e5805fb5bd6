//! Schedules ready nodes on workers and waits for their completion.
//!
//! Each ready node gets its own spawned task per superstep/wavefront,
//! reporting its completion back over an `mpsc` channel to whichever
//! `wait()` discipline the run is using.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::channel_manager::EdgeHandler;
use crate::error::SimpleError;
use crate::graph::node::NodeAction;
use crate::graph::run_context::RunContext;
use crate::interrupt::NodeFailure;
use crate::value::Value;

/// An explicit cancellation object: a `watch` receiver plus an optional
/// deadline, observed from `TaskManager::wait`'s `select!`.
#[derive(Clone)]
pub struct CancelSignal {
    rx: tokio::sync::watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    pub fn new(rx: tokio::sync::watch::Receiver<bool>) -> Self {
        Self { rx, deadline: None }
    }

    pub fn with_deadline(rx: tokio::sync::watch::Receiver<bool>, deadline: Instant) -> Self {
        Self {
            rx,
            deadline: Some(deadline),
        }
    }

    /// A signal that never fires; used when a run has no cancellation source.
    pub fn never() -> Self {
        let (_tx, rx) = tokio::sync::watch::channel(false);
        Self { rx, deadline: None }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    async fn cancelled(&mut self) {
        let _ = self.rx.changed().await;
    }
}

/// A ready node plus everything `TaskManager` needs to run it: the action,
/// its input, its pre-/post-handler, and the per-node `RunContext` it
/// executes under (carrying, for a rerun node
/// restored from a checkpoint, that node's nested sub-graph checkpoint and
/// already-executed-tools list, see `graph::runner::run_loop`).
pub struct PreparedTask {
    pub node: String,
    pub action: Arc<dyn NodeAction>,
    pub input: Value,
    pub pre_handler: Option<Arc<dyn EdgeHandler>>,
    pub post_handler: Option<Arc<dyn EdgeHandler>>,
    pub ctx: Arc<RunContext>,
}

/// Outcome of one task, successful or not.
pub struct CompletedTask {
    pub node: String,
    pub outcome: Result<Value, NodeFailure>,
}

/// Two scheduling disciplines, selected by `TriggerMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// DAG mode: loop taking completions until the in-flight count is zero.
    WaitAll,
    /// Pregel mode: take exactly one completion, escalating to wait-all on a
    /// deadline-less cancel signal.
    WaitAny,
}

/// Result of a single `wait()` call.
pub struct WaitOutcome {
    pub completed: Vec<CompletedTask>,
    pub cancelled: bool,
    /// Node keys still in flight when a deadline expired; rerun candidates
    /// on the next resume.
    pub cancelled_nodes: Vec<String>,
}

pub struct TaskManager {
    mode: WaitMode,
    tx: mpsc::UnboundedSender<CompletedTask>,
    rx: mpsc::UnboundedReceiver<CompletedTask>,
    in_flight: HashMap<String, ()>,
    eager_execution_disabled: bool,
}

impl TaskManager {
    pub fn new(mode: WaitMode, eager_execution_disabled: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            mode,
            tx,
            rx,
            in_flight: HashMap::new(),
            eager_execution_disabled,
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Runs each task's pre-handler synchronously on the caller's task;
    /// failures are returned immediately without starting the node action.
    /// Survivors are dispatched — inline when there is exactly one of them
    /// and eager inline execution is not disabled, otherwise spawned.
    pub async fn submit(&mut self, tasks: Vec<PreparedTask>) -> Vec<CompletedTask> {
        let mut completed_immediately = Vec::new();
        let mut survivors = Vec::new();

        for mut task in tasks {
            if let Some(handler) = task.pre_handler.clone() {
                match handler.apply(&task.node, &task.node, task.input).await {
                    Ok(v) => task.input = v,
                    Err(e) => {
                        completed_immediately.push(CompletedTask {
                            node: task.node,
                            outcome: Err(NodeFailure::Error(e)),
                        });
                        continue;
                    }
                }
            }
            survivors.push(task);
        }

        let run_inline = !self.eager_execution_disabled
            && self.in_flight.is_empty()
            && (survivors.len() == 1 || self.mode == WaitMode::WaitAll);

        if run_inline {
            if let Some(task) = survivors.pop() {
                completed_immediately.push(run_task(task).await);
            }
        }

        for task in survivors {
            let node = task.node.clone();
            self.in_flight.insert(node, ());
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let completed = run_task(task).await;
                let _ = tx.send(completed);
            });
        }

        completed_immediately
    }

    /// Waits for task completions per the selected discipline, racing an
    /// optional cancellation signal.
    pub async fn wait(&mut self, cancel: Option<&mut CancelSignal>) -> WaitOutcome {
        match self.mode {
            WaitMode::WaitAll => self.wait_all(cancel).await,
            WaitMode::WaitAny => self.wait_any(cancel).await,
        }
    }

    async fn wait_all(&mut self, mut cancel: Option<&mut CancelSignal>) -> WaitOutcome {
        let mut completed = Vec::new();
        let deadline = cancel.as_ref().and_then(|c| c.deadline);

        loop {
            if self.in_flight.is_empty() {
                return WaitOutcome {
                    completed,
                    cancelled: false,
                    cancelled_nodes: vec![],
                };
            }
            let recv = self.rx.recv();
            tokio::pin!(recv);
            let sleep = match deadline {
                Some(d) => tokio::time::sleep_until(d),
                None => tokio::time::sleep(Duration::from_secs(u64::MAX / 2)),
            };
            tokio::pin!(sleep);

            tokio::select! {
                Some(task) = &mut recv => {
                    self.in_flight.remove(&task.node);
                    completed.push(task);
                }
                _ = &mut sleep, if deadline.is_some() => {
                    let cancelled_nodes = self.in_flight.keys().cloned().collect();
                    self.in_flight.clear();
                    return WaitOutcome { completed, cancelled: true, cancelled_nodes };
                }
            }

            if let Some(c) = cancel.as_mut() {
                if c.is_cancelled() && c.deadline.is_none() {
                    // No deadline: let in-flight tasks keep running, but mark cancelled.
                    continue;
                }
            }
        }
    }

    async fn wait_any(&mut self, mut cancel: Option<&mut CancelSignal>) -> WaitOutcome {
        if self.in_flight.is_empty() {
            return WaitOutcome {
                completed: vec![],
                cancelled: false,
                cancelled_nodes: vec![],
            };
        }

        let deadline = cancel.as_ref().and_then(|c| c.deadline);
        let sleep = match deadline {
            Some(d) => tokio::time::sleep_until(d),
            None => tokio::time::sleep(Duration::from_secs(u64::MAX / 2)),
        };
        tokio::pin!(sleep);

        tokio::select! {
            Some(task) = self.rx.recv() => {
                self.in_flight.remove(&task.node);
                let cancelled = cancel.as_mut().map(|c| c.is_cancelled() && c.deadline.is_none()).unwrap_or(false);
                if cancelled {
                    // Deadline-less cancel while waiting for any: escalate to wait-all.
                    let mut outcome = self.wait_all(cancel).await;
                    outcome.completed.insert(0, task);
                    outcome.cancelled = true;
                    return outcome;
                }
                WaitOutcome { completed: vec![task], cancelled: false, cancelled_nodes: vec![] }
            }
            _ = &mut sleep, if deadline.is_some() => {
                let cancelled_nodes = self.in_flight.keys().cloned().collect();
                self.in_flight.clear();
                WaitOutcome { completed: vec![], cancelled: true, cancelled_nodes }
            }
        }
    }
}

/// Runs one task's action, then its post-handler. Panics inside either are
/// caught by spawning onto a dedicated task and reading the `JoinHandle`'s
/// result: a spawned task that panics yields `Err(JoinError)` instead of
/// taking down the caller.
async fn run_task(task: PreparedTask) -> CompletedTask {
    let PreparedTask {
        node,
        action,
        input,
        post_handler,
        ctx,
        ..
    } = task;

    let node_for_panic = node.clone();
    let join = tokio::spawn(async move { action.call(input, &ctx).await });
    let outcome = match join.await {
        Ok(result) => result,
        Err(join_err) => Err(NodeFailure::Error(Box::new(SimpleError(format!(
            "node {node_for_panic} panicked: {join_err}"
        ))))),
    };

    let outcome = match outcome {
        Ok(value) => {
            if let Some(handler) = post_handler {
                match handler.apply(&node, &node, value).await {
                    Ok(v) => Ok(v),
                    Err(e) => Err(NodeFailure::Error(e)),
                }
            } else {
                Ok(value)
            }
        }
        err => err,
    };

    CompletedTask { node, outcome }
}
