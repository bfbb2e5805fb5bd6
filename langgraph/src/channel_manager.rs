//! Owns every channel; routes completed-node outputs and branch decisions,
//! and computes the ready set.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;

use crate::branch::{Branch, BranchEvaluator};
use crate::channels::{Channel, ChannelSnapshot, DagChannel, MergeConfig, PregelChannel};
use crate::error::GraphError;
use crate::graph::node::END;
use crate::value::Value;

/// A value -> value (or stream -> stream) transform applied along one edge,
/// or as a node's pre-handler. Field mapping and type conversion between
/// producer and consumer shapes live behind this trait; their internals are
/// an external collaborator's concern (out of scope for the core).
#[async_trait]
pub trait EdgeHandler: Send + Sync {
    async fn apply(
        &self,
        from: &str,
        to: &str,
        value: Value,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// Discipline selector for how a [`Channel`] decides readiness; chosen per
/// graph at compile time from `CompileOptions::trigger_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Pregel-style: ready on any predecessor write, superstep semantics.
    AnyPredecessor,
    /// DAG-style: ready only once every declared predecessor has resolved.
    AllPredecessor,
}

/// Static per-node topology the manager needs beyond what a `Channel` stores
/// internally: declared successors (for branch skip BFS) and registered
/// handler chains.
#[derive(Default)]
struct Topology {
    data_successors: HashMap<String, HashSet<String>>,
    control_successors: HashMap<String, HashSet<String>>,
    edge_handlers: HashMap<(String, String), Vec<std::sync::Arc<dyn EdgeHandler>>>,
    pre_node_handlers: HashMap<String, Vec<std::sync::Arc<dyn EdgeHandler>>>,
    merge_configs: HashMap<String, MergeConfig>,
}

pub struct ChannelManager {
    mode: TriggerMode,
    channels: HashMap<String, Box<dyn Channel>>,
    topology: Topology,
}

impl ChannelManager {
    pub fn new(mode: TriggerMode) -> Self {
        Self {
            mode,
            channels: HashMap::new(),
            topology: Topology::default(),
        }
    }

    /// Declares a node's channel with its data/control predecessor sets.
    /// Must be called once per node (including `END`) before the run starts.
    pub fn declare_node(
        &mut self,
        node: impl Into<String>,
        data_predecessors: HashSet<String>,
        control_predecessors: HashSet<String>,
    ) {
        let node = node.into();
        for p in &data_predecessors {
            self.topology
                .data_successors
                .entry(p.clone())
                .or_default()
                .insert(node.clone());
        }
        for p in &control_predecessors {
            self.topology
                .control_successors
                .entry(p.clone())
                .or_default()
                .insert(node.clone());
        }
        let channel: Box<dyn Channel> = match self.mode {
            TriggerMode::AnyPredecessor => {
                let mut all = data_predecessors.clone();
                all.extend(control_predecessors.clone());
                Box::new(PregelChannel::new(all))
            }
            TriggerMode::AllPredecessor => {
                Box::new(DagChannel::new(data_predecessors, control_predecessors))
            }
        };
        self.channels.insert(node, channel);
    }

    pub fn set_merge_config(&mut self, node: impl Into<String>, cfg: MergeConfig) {
        self.topology.merge_configs.insert(node.into(), cfg);
    }

    pub fn set_edge_handlers(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        handlers: Vec<std::sync::Arc<dyn EdgeHandler>>,
    ) {
        self.topology
            .edge_handlers
            .insert((from.into(), to.into()), handlers);
    }

    pub fn set_pre_node_handlers(
        &mut self,
        node: impl Into<String>,
        handlers: Vec<std::sync::Arc<dyn EdgeHandler>>,
    ) {
        self.topology.pre_node_handlers.insert(node.into(), handlers);
    }

    /// Filters `(to, from, value)` triples against `to`'s declared
    /// data-predecessor set, runs the edge-handler chain on accepted pairs,
    /// and hands the result to the target channel's `report_values`.
    /// Pairs whose `from` is not declared are dropped; stream values among
    /// them are closed to prevent leaks.
    pub async fn update_values(&mut self, updates: Vec<(String, String, Value)>) -> Result<(), GraphError> {
        let mut by_target: HashMap<String, Vec<(String, Value)>> = HashMap::new();
        for (to, from, mut value) in updates {
            if let Some(handlers) = self.topology.edge_handlers.get(&(from.clone(), to.clone())) {
                for handler in handlers {
                    value = handler.apply(&from, &to, value).await.map_err(|e| {
                        GraphError::EdgeHandlerFailed {
                            from: from.clone(),
                            to: to.clone(),
                            source: e,
                        }
                    })?;
                }
            }
            by_target.entry(to).or_default().push((from, value));
        }
        for (to, values) in by_target {
            if let Some(channel) = self.channels.get_mut(&to) {
                channel.report_values(values).await;
            } else {
                for (_, v) in values {
                    v.close().await;
                }
            }
        }
        Ok(())
    }

    /// Symmetric control-edge counterpart of `update_values`.
    pub fn update_dependencies(&mut self, deps: Vec<(String, Vec<String>)>) {
        for (to, from) in deps {
            if let Some(channel) = self.channels.get_mut(&to) {
                channel.report_dependencies(&from);
            }
        }
    }

    /// Walks every channel; for each ready one, fetches its merged value,
    /// applies the target's pre-node handler chain, and includes it.
    pub async fn get_ready(&mut self) -> Result<HashMap<String, Value>, GraphError> {
        let mut ready = HashMap::new();
        let node_ids: Vec<String> = self.channels.keys().cloned().collect();
        for node in node_ids {
            let merge = self.topology.merge_configs.get(&node).copied().unwrap_or_default();
            let channel = self.channels.get_mut(&node).expect("node_ids from channels map");
            if !channel.is_ready() {
                continue;
            }
            let Some(mut value) = channel.get(merge).await? else {
                continue;
            };
            if let Some(handlers) = self.topology.pre_node_handlers.get(&node) {
                for handler in handlers {
                    value = handler
                        .apply(&node, &node, value)
                        .await
                        .map_err(|e| GraphError::EdgeHandlerFailed {
                            from: node.clone(),
                            to: node.clone(),
                            source: e,
                        })?;
                }
            }
            ready.insert(node, value);
        }
        Ok(ready)
    }

    /// The single atomic step the Runner uses per iteration: route values and
    /// control dependencies, then compute the resulting ready set.
    pub async fn update_and_get(
        &mut self,
        values: Vec<(String, String, Value)>,
        deps: Vec<(String, Vec<String>)>,
    ) -> Result<HashMap<String, Value>, GraphError> {
        self.update_values(values).await?;
        self.update_dependencies(deps);
        self.get_ready().await
    }

    /// Evaluates every branch from one source node (already deduplicated by
    /// the caller, see `BranchEvaluator::dedupe_skips`), marks the skipped
    /// successors, and BFS-propagates skip to their own successors, stopping
    /// at `END` — `END` is never reported skipped, since a downstream run
    /// must still be able to observe completion even when every branch skips it.
    pub fn report_branch(&mut self, from: &str, skipped_successors: &HashSet<String>) {
        let mut queue: VecDeque<(String, String)> = skipped_successors
            .iter()
            .filter(|s| s.as_str() != END)
            .map(|s| (from.to_string(), s.clone()))
            .collect();
        let mut visited: HashSet<String> = HashSet::new();

        while let Some((origin, target)) = queue.pop_front() {
            if target == END {
                continue;
            }
            let Some(channel) = self.channels.get_mut(&target) else {
                continue;
            };
            let became_skipped = channel.report_skip(&[origin]);
            if !became_skipped || visited.contains(&target) {
                continue;
            }
            visited.insert(target.clone());

            let mut next_successors: HashSet<String> = self
                .topology
                .data_successors
                .get(&target)
                .cloned()
                .unwrap_or_default();
            next_successors.extend(
                self.topology
                    .control_successors
                    .get(&target)
                    .cloned()
                    .unwrap_or_default(),
            );
            for succ in next_successors {
                if succ != END {
                    queue.push_back((target.clone(), succ));
                }
            }
        }
    }

    /// Evaluates a source node's branches, deduplicates skips across them,
    /// and routes the result via `report_branch`. Returns the union of
    /// selected successors across every branch (to fold into data-successors
    /// for the next task fan-out).
    pub async fn route_branches(
        &mut self,
        from: &str,
        branches: &[Branch],
        value: &Value,
    ) -> Result<HashSet<String>, GraphError> {
        let mut outcomes = Vec::with_capacity(branches.len());
        for branch in branches {
            let cloned = clone_value_for_branch(value);
            outcomes.push(BranchEvaluator::evaluate(branch, cloned).await?);
        }
        let skipped = BranchEvaluator::dedupe_skips(&outcomes);
        self.report_branch(from, &skipped);
        Ok(outcomes.into_iter().flat_map(|o| o.selected).collect())
    }

    pub fn load_channels(&mut self, snapshots: HashMap<String, ChannelSnapshot>) {
        for (node, snapshot) in snapshots {
            if let Some(channel) = self.channels.get_mut(&node) {
                channel.restore(snapshot);
            }
        }
    }

    pub fn snapshot_channels(&self) -> HashMap<String, ChannelSnapshot> {
        self.channels.iter().map(|(k, v)| (k.clone(), v.snapshot())).collect()
    }

    pub async fn convert_channel_values(&mut self, node: &str, f: &dyn Fn(Value) -> Value) {
        if let Some(channel) = self.channels.get_mut(node) {
            channel.convert_values(f).await;
        }
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }
}

/// Branches each receive their own copy of the source node's output; for a
/// streaming value the caller must have already split it (the `Runner`
/// owns fan-out sizing). Here we only need a lightweight duplication for the
/// non-stream case, since `Value::Single` is cheap to clone.
fn clone_value_for_branch(value: &Value) -> Value {
    match value {
        Value::Single(v) => Value::Single(v.clone()),
        Value::Stream(s) => Value::Stream(s.clone()),
    }
}
