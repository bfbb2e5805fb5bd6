//! Minimal graph-construction surface: enough `add_node`/`add_edge`/`compile`
//! plumbing to produce the `NodeCall` table the scheduler runs against. Full
//! type validation and ergonomics for building graphs live one layer up in
//! whatever wraps this core; here it's just enough to validate references and
//! assemble data/control/branch edges into a compiled graph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::branch::Branch;
use crate::channel_manager::EdgeHandler;
use crate::error::GraphError;
use crate::graph::node::{NodeAction, NodeCall, END, START};
use crate::options::CompileOptions;
use crate::value::TypeDescriptor;

use super::compiled::CompiledGraph;

#[derive(Default)]
pub struct GraphBuilder {
    actions: HashMap<String, Arc<dyn NodeAction>>,
    data_edges: Vec<(String, String)>,
    control_edges: Vec<(String, String)>,
    edge_handlers: HashMap<(String, String), Vec<Arc<dyn EdgeHandler>>>,
    branches: Vec<Branch>,
    pre_handlers: HashMap<String, Arc<dyn EdgeHandler>>,
    post_handlers: HashMap<String, Arc<dyn EdgeHandler>>,
    type_checked: HashMap<String, bool>,
    input_types: HashMap<String, TypeDescriptor>,
    output_types: HashMap<String, TypeDescriptor>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, key: impl Into<String>, action: Arc<dyn NodeAction>) -> &mut Self {
        self.actions.insert(key.into(), action);
        self
    }

    /// Declares a data edge; `START`/`END` are valid endpoints without a
    /// registered action.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.data_edges.push((from.into(), to.into()));
        self
    }

    pub fn add_control_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.control_edges.push((from.into(), to.into()));
        self
    }

    pub fn add_branch(&mut self, branch: Branch) -> &mut Self {
        self.branches.push(branch);
        self
    }

    pub fn with_pre_handler(&mut self, node: impl Into<String>, handler: Arc<dyn EdgeHandler>) -> &mut Self {
        self.pre_handlers.insert(node.into(), handler);
        self
    }

    pub fn with_post_handler(&mut self, node: impl Into<String>, handler: Arc<dyn EdgeHandler>) -> &mut Self {
        self.post_handlers.insert(node.into(), handler);
        self
    }

    pub fn with_edge_handler(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        handler: Arc<dyn EdgeHandler>,
    ) -> &mut Self {
        self.edge_handlers
            .entry((from.into(), to.into()))
            .or_default()
            .push(handler);
        self
    }

    /// Opts a node out of type-checked runtime conversions (defaults to on).
    pub fn without_type_checking(&mut self, node: impl Into<String>) -> &mut Self {
        self.type_checked.insert(node.into(), false);
        self
    }

    /// Declares the runtime type a node expects on its input edge; checked
    /// against the merged value the channel fabric hands the node when it is
    /// type-checked (the default). Leave undeclared to keep `TypeDescriptor::ANY`.
    pub fn with_input_type(&mut self, node: impl Into<String>, ty: TypeDescriptor) -> &mut Self {
        self.input_types.insert(node.into(), ty);
        self
    }

    /// Declares the runtime type a node's action produces, for callers that
    /// want to validate it against a downstream edge; the core itself only
    /// asserts on input (output validation is left to whatever edge handler
    /// is installed on the outgoing edge).
    pub fn with_output_type(&mut self, node: impl Into<String>, ty: TypeDescriptor) -> &mut Self {
        self.output_types.insert(node.into(), ty);
        self
    }

    pub fn compile(self, options: CompileOptions) -> Result<CompiledGraph, GraphError> {
        for (from, to) in self.data_edges.iter().chain(self.control_edges.iter()) {
            if from != START && !self.actions.contains_key(from) {
                return Err(GraphError::Compilation(format!("unknown node '{from}' in edge")));
            }
            if to != END && !self.actions.contains_key(to) {
                return Err(GraphError::Compilation(format!("unknown node '{to}' in edge")));
            }
        }
        for branch in &self.branches {
            if branch.source != START && !self.actions.contains_key(&branch.source) {
                return Err(GraphError::Compilation(format!(
                    "unknown branch source '{}'",
                    branch.source
                )));
            }
        }
        let has_start_edge = self.data_edges.iter().any(|(f, _)| f == START)
            || self.branches.iter().any(|b| b.source == START);
        if !has_start_edge {
            return Err(GraphError::Compilation(
                "graph has no edge or branch from START".to_string(),
            ));
        }

        let mut data_successors: HashMap<String, HashSet<String>> = HashMap::new();
        for (from, to) in &self.data_edges {
            data_successors.entry(from.clone()).or_default().insert(to.clone());
        }
        let mut control_successors: HashMap<String, HashSet<String>> = HashMap::new();
        for (from, to) in &self.control_edges {
            control_successors.entry(from.clone()).or_default().insert(to.clone());
        }
        for branch in &self.branches {
            data_successors
                .entry(branch.source.clone())
                .or_default()
                .extend(branch.successors.iter().cloned());
        }

        let mut nodes = HashMap::new();
        for (key, action) in self.actions {
            let branches = self
                .branches
                .iter()
                .filter(|b| b.source == key)
                .map(clone_branch)
                .collect();
            nodes.insert(
                key.clone(),
                NodeCall {
                    key: key.clone(),
                    action,
                    data_successors: data_successors.remove(&key).unwrap_or_default(),
                    control_successors: control_successors.remove(&key).unwrap_or_default(),
                    branches,
                    pre_handler: self.pre_handlers.get(&key).cloned(),
                    post_handler: self.post_handlers.get(&key).cloned(),
                    type_checked: *self.type_checked.get(&key).unwrap_or(&true),
                    input_type: self.input_types.get(&key).cloned().unwrap_or(TypeDescriptor::ANY),
                    output_type: self.output_types.get(&key).cloned().unwrap_or(TypeDescriptor::ANY),
                },
            );
        }

        let start_data_successors = data_successors.remove(START).unwrap_or_default();
        let start_control_successors = control_successors.remove(START).unwrap_or_default();
        let start_branches: Vec<Branch> = self
            .branches
            .iter()
            .filter(|b| b.source == START)
            .map(clone_branch)
            .collect();

        Ok(CompiledGraph::new(
            nodes,
            start_data_successors,
            start_control_successors,
            start_branches,
            self.edge_handlers,
            options,
        ))
    }
}

fn clone_branch(b: &Branch) -> Branch {
    Branch {
        source: b.source.clone(),
        successors: b.successors.clone(),
        predicate: b.predicate.clone(),
        pre_handlers: b.pre_handlers.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::graph::run_context::RunContext;
    use crate::interrupt::NodeFailure;
    use crate::value::Value;

    struct Noop;
    #[async_trait]
    impl NodeAction for Noop {
        async fn call(&self, input: Value, _ctx: &RunContext) -> Result<Value, NodeFailure> {
            Ok(input)
        }
    }

    /// **Scenario**: an edge referencing an undeclared node fails compilation.
    #[test]
    fn compile_rejects_unknown_node_in_edge() {
        let mut b = GraphBuilder::new();
        b.add_edge(START, "ghost");
        let err = b.compile(CompileOptions::default()).unwrap_err();
        assert!(matches!(err, GraphError::Compilation(_)));
    }

    /// **Scenario**: a graph with no edge from START fails compilation.
    #[test]
    fn compile_rejects_missing_start_edge() {
        let mut b = GraphBuilder::new();
        b.add_node("a", Arc::new(Noop));
        b.add_edge("a", END);
        let err = b.compile(CompileOptions::default()).unwrap_err();
        assert!(matches!(err, GraphError::Compilation(_)));
    }

    /// **Scenario**: a minimal linear graph compiles successfully.
    #[test]
    fn compile_accepts_linear_graph() {
        let mut b = GraphBuilder::new();
        b.add_node("a", Arc::new(Noop));
        b.add_edge(START, "a");
        b.add_edge("a", END);
        assert!(b.compile(CompileOptions::default()).is_ok());
    }
}
