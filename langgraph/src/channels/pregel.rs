//! Pregel discipline channel: one merged value per superstep.
//!
//! Ready iff any live (non-skipped) predecessor wrote in the current
//! superstep; reading clears the current-superstep contribution so the next
//! superstep starts empty.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::GraphError;
use crate::value::{merge_streams, merge_values, Value};

use super::{Channel, ChannelSnapshot, MergeConfig};

pub struct PregelChannel {
    predecessors: HashSet<String>,
    pending: Vec<Value>,
    /// Predecessors that reported a value or a resolved control dependency
    /// this superstep (used only to decide whether `get` yields a value when
    /// no data arrived — a purely control-edge trigger).
    control_reported: HashSet<String>,
    skipped: HashSet<String>,
    is_skipped: bool,
}

impl PregelChannel {
    pub fn new(predecessors: HashSet<String>) -> Self {
        Self {
            predecessors,
            pending: Vec::new(),
            control_reported: HashSet::new(),
            skipped: HashSet::new(),
            is_skipped: false,
        }
    }

    fn recompute_skip(&mut self) -> bool {
        if self.is_skipped || self.predecessors.is_empty() {
            return false;
        }
        let all_skipped = self.predecessors.iter().all(|p| self.skipped.contains(p));
        if all_skipped {
            self.is_skipped = true;
            return true;
        }
        false
    }
}

#[async_trait]
impl Channel for PregelChannel {
    async fn report_values(&mut self, from_values: Vec<(String, Value)>) {
        for (from, value) in from_values {
            if !self.predecessors.contains(&from) {
                value.close().await;
                continue;
            }
            self.control_reported.insert(from);
            self.pending.push(value);
        }
    }

    fn report_dependencies(&mut self, from: &[String]) {
        for f in from {
            if self.predecessors.contains(f) {
                self.control_reported.insert(f.clone());
            }
        }
    }

    fn report_skip(&mut self, from: &[String]) -> bool {
        for f in from {
            self.skipped.insert(f.clone());
        }
        self.recompute_skip()
    }

    async fn get(&mut self, merge: MergeConfig) -> Result<Option<Value>, GraphError> {
        if self.pending.is_empty() && self.control_reported.is_empty() {
            return Ok(None);
        }
        if self.is_skipped {
            return Ok(None);
        }
        let value = if self.pending.is_empty() {
            Value::Single(serde_json::Value::Null)
        } else if self.pending.iter().any(|v| v.is_stream()) {
            let streams: Vec<_> = self
                .pending
                .drain(..)
                .map(|v| match v {
                    Value::Stream(s) => s,
                    Value::Single(s) => crate::value::StreamReader::from_values(vec![s]),
                })
                .collect();
            Value::Stream(merge_streams(streams, merge.stream_merge_with_source_eof))
        } else {
            let values: Vec<_> = self
                .pending
                .drain(..)
                .map(|v| match v {
                    Value::Single(s) => s,
                    Value::Stream(_) => unreachable!("filtered above"),
                })
                .collect();
            Value::Single(merge_values("pregel-channel", values)?)
        };
        self.pending.clear();
        self.control_reported.clear();
        Ok(Some(value))
    }

    fn is_ready(&self) -> bool {
        !self.is_skipped && (!self.pending.is_empty() || !self.control_reported.is_empty())
    }

    fn is_skipped(&self) -> bool {
        self.is_skipped
    }

    async fn convert_values(&mut self, f: &dyn Fn(Value) -> Value) {
        let pending = std::mem::take(&mut self.pending);
        self.pending = pending.into_iter().map(f).collect();
    }

    fn load(&mut self, other: &dyn Channel) {
        let other = other
            .as_any()
            .downcast_ref::<PregelChannel>()
            .expect("load() called with mismatched channel variant");
        self.predecessors = other.predecessors.clone();
        self.control_reported = other.control_reported.clone();
        self.skipped = other.skipped.clone();
        self.is_skipped = other.is_skipped;
        // `pending` holds live `Value`s (possibly streams); cloning a
        // snapshot's materialized form is handled via `restore`, not `load`.
        self.pending.clear();
    }

    fn snapshot(&self) -> ChannelSnapshot {
        let value = self.pending.first().and_then(|v| match v {
            Value::Single(j) => Some(j.clone()),
            Value::Stream(_) => None,
        });
        ChannelSnapshot {
            pregel_value: value,
            pregel_ready: self.is_ready(),
            pregel_skipped: self.is_skipped,
            ..Default::default()
        }
    }

    fn restore(&mut self, snapshot: ChannelSnapshot) {
        self.pending.clear();
        self.control_reported.clear();
        if let Some(v) = snapshot.pregel_value {
            self.pending.push(Value::Single(v));
            self.control_reported.insert(String::new());
        }
        self.is_skipped = snapshot.pregel_skipped;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preds(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// **Scenario**: not ready before any predecessor reports.
    #[tokio::test]
    async fn not_ready_before_any_report() {
        let ch = PregelChannel::new(preds(&["a", "b"]));
        assert!(!ch.is_ready());
    }

    /// **Scenario**: ready once any live predecessor reports a value.
    #[tokio::test]
    async fn ready_after_one_predecessor_reports() {
        let mut ch = PregelChannel::new(preds(&["a", "b"]));
        ch.report_values(vec![("a".into(), Value::Single(serde_json::json!(1)))])
            .await;
        assert!(ch.is_ready());
    }

    /// **Scenario**: get() clears the current-superstep contribution (reading resets for next superstep).
    #[tokio::test]
    async fn get_resets_for_next_superstep() {
        let mut ch = PregelChannel::new(preds(&["a"]));
        ch.report_values(vec![("a".into(), Value::Single(serde_json::json!(1)))])
            .await;
        let got = ch.get(MergeConfig::default()).await.unwrap();
        assert!(got.is_some());
        assert!(!ch.is_ready());
        let got2 = ch.get(MergeConfig::default()).await.unwrap();
        assert!(got2.is_none());
    }

    /// **Scenario**: node becomes skipped only once every predecessor is skipped.
    #[tokio::test]
    async fn skip_requires_all_predecessors() {
        let mut ch = PregelChannel::new(preds(&["a", "b"]));
        assert!(!ch.report_skip(&["a".to_string()]));
        assert!(!ch.is_skipped());
        assert!(ch.report_skip(&["b".to_string()]));
        assert!(ch.is_skipped());
    }

    /// **Scenario**: unknown predecessor in report_values is ignored and its stream value is closed.
    #[tokio::test]
    async fn unknown_predecessor_ignored() {
        let mut ch = PregelChannel::new(preds(&["a"]));
        ch.report_values(vec![(
            "ghost".into(),
            Value::Stream(crate::value::StreamReader::from_values(vec![serde_json::json!(1)])),
        )])
        .await;
        assert!(!ch.is_ready());
    }
}
