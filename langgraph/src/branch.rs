//! Conditional-edge evaluation and skip propagation.
//!
//! A [`Branch`] emanates from one node with an explicit successor set `S`; its
//! [`BranchPredicate`] computes the selected subset `T ⊆ S` at run time. The
//! Runner deduplicates selections across every branch of the same source
//! node before handing the unselected remainder to
//! [`ChannelManager::report_branch`](crate::channel_manager::ChannelManager::report_branch),
//! so a successor picked by any branch is never skipped just because another
//! branch on the same node skipped it.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::GraphError;
use crate::value::Value;

/// Predicate a [`Branch`] evaluates against the source node's output.
#[async_trait]
pub trait BranchPredicate: Send + Sync {
    /// Non-streaming: runs synchronously over the materialized value.
    async fn invoke(&self, value: &serde_json::Value) -> Result<HashSet<String>, GraphError>;

    /// Streaming: drains the stream, then runs the same predicate logic.
    /// Default implementation materializes then delegates to `invoke`.
    async fn collect(&self, stream: crate::value::StreamReader) -> Result<HashSet<String>, GraphError> {
        let items = stream.collect().await;
        let merged = serde_json::Value::Array(items);
        self.invoke(&merged).await
    }
}

/// A conditional edge from one node with its declared successor set and predicate.
pub struct Branch {
    pub source: String,
    pub successors: HashSet<String>,
    pub predicate: std::sync::Arc<dyn BranchPredicate>,
    /// Handlers applied before the predicate runs (type conversion, field mapping).
    pub pre_handlers: Vec<std::sync::Arc<dyn crate::channel_manager::EdgeHandler>>,
}

/// Result of evaluating one branch: the selected subset and the rest, skipped.
pub struct BranchOutcome {
    pub selected: HashSet<String>,
    pub skipped: HashSet<String>,
}

pub struct BranchEvaluator;

impl BranchEvaluator {
    /// Evaluates a single branch against a node's output value, applying its
    /// pre-branch handlers first.
    pub async fn evaluate(branch: &Branch, value: Value) -> Result<BranchOutcome, GraphError> {
        let mut value = value;
        for handler in &branch.pre_handlers {
            value = handler
                .apply(&branch.source, "branch", value)
                .await
                .map_err(|e| GraphError::EdgeHandlerFailed {
                    from: branch.source.clone(),
                    to: "branch".to_string(),
                    source: e,
                })?;
        }

        let selected = match value {
            Value::Single(v) => branch
                .predicate
                .invoke(&v)
                .await
                .map_err(|e| GraphError::BranchFailed(branch.source.clone(), e.to_string()))?,
            Value::Stream(s) => branch
                .predicate
                .collect(s)
                .await
                .map_err(|e| GraphError::BranchFailed(branch.source.clone(), e.to_string()))?,
        };

        let selected: HashSet<String> = selected.intersection(&branch.successors).cloned().collect();
        let skipped: HashSet<String> = branch.successors.difference(&selected).cloned().collect();
        Ok(BranchOutcome { selected, skipped })
    }

    /// Deduplicates skip sets across every branch of the same source node: a
    /// successor selected by any branch is never skipped.
    pub fn dedupe_skips(outcomes: &[BranchOutcome]) -> HashSet<String> {
        let all_selected: HashSet<String> = outcomes.iter().flat_map(|o| o.selected.iter().cloned()).collect();
        let all_skipped: HashSet<String> = outcomes.iter().flat_map(|o| o.skipped.iter().cloned()).collect();
        all_skipped.difference(&all_selected).cloned().collect()
    }
}
