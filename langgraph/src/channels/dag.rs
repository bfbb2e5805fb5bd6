//! DAG discipline channel: fan-in barrier over declared predecessors.
//!
//! Ready exactly when every declared data predecessor has supplied a value
//! and every declared control predecessor is resolved. Once ready and
//! consumed, a `DagChannel` cannot become ready again in the same run.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::GraphError;
use crate::value::{merge_streams, merge_values, Value};

use super::{Channel, ChannelSnapshot, MergeConfig};

pub struct DagChannel {
    data_predecessors: HashSet<String>,
    control_predecessors: HashSet<String>,
    values: HashMap<String, Value>,
    resolved_controls: HashSet<String>,
    skipped: HashSet<String>,
    is_skipped: bool,
    consumed: bool,
}

impl DagChannel {
    pub fn new(data_predecessors: HashSet<String>, control_predecessors: HashSet<String>) -> Self {
        Self {
            data_predecessors,
            control_predecessors,
            values: HashMap::new(),
            resolved_controls: HashSet::new(),
            skipped: HashSet::new(),
            is_skipped: false,
            consumed: false,
        }
    }

    fn data_satisfied(&self) -> bool {
        self.data_predecessors
            .iter()
            .all(|p| self.values.contains_key(p) || self.skipped.contains(p))
    }

    fn control_satisfied(&self) -> bool {
        self.control_predecessors
            .iter()
            .all(|p| self.resolved_controls.contains(p) || self.skipped.contains(p))
    }

    fn recompute_skip(&mut self) -> bool {
        if self.is_skipped || self.data_predecessors.is_empty() {
            return false;
        }
        let all_data_skipped = self.data_predecessors.iter().all(|p| self.skipped.contains(p));
        if all_data_skipped {
            self.is_skipped = true;
            return true;
        }
        false
    }
}

#[async_trait]
impl Channel for DagChannel {
    async fn report_values(&mut self, from_values: Vec<(String, Value)>) {
        for (from, value) in from_values {
            if !self.data_predecessors.contains(&from) {
                value.close().await;
                continue;
            }
            self.values.insert(from, value);
        }
    }

    fn report_dependencies(&mut self, from: &[String]) {
        for f in from {
            if self.control_predecessors.contains(f) {
                self.resolved_controls.insert(f.clone());
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
        if self.consumed || self.is_skipped {
            return Ok(None);
        }
        if !(self.data_satisfied() && self.control_satisfied()) {
            return Ok(None);
        }
        let live: Vec<Value> = self
            .data_predecessors
            .iter()
            .filter_map(|p| self.values.get(p))
            .cloned()
            .collect();
        let merged = if live.is_empty() {
            Value::Single(serde_json::Value::Null)
        } else if live.iter().any(|v| v.is_stream()) {
            let streams: Vec<_> = live
                .into_iter()
                .map(|v| match v {
                    Value::Stream(s) => s,
                    Value::Single(s) => crate::value::StreamReader::from_values(vec![s]),
                })
                .collect();
            Value::Stream(merge_streams(streams, merge.stream_merge_with_source_eof))
        } else {
            let values: Vec<_> = live
                .into_iter()
                .map(|v| match v {
                    Value::Single(s) => s,
                    Value::Stream(_) => unreachable!("filtered above"),
                })
                .collect();
            Value::Single(merge_values("dag-channel", values)?)
        };
        self.consumed = true;
        Ok(Some(merged))
    }

    fn is_ready(&self) -> bool {
        !self.consumed && !self.is_skipped && self.data_satisfied() && self.control_satisfied()
    }

    fn is_skipped(&self) -> bool {
        self.is_skipped
    }

    async fn convert_values(&mut self, f: &dyn Fn(Value) -> Value) {
        let keys: Vec<String> = self.values.keys().cloned().collect();
        for k in keys {
            if let Some(v) = self.values.remove(&k) {
                self.values.insert(k, f(v));
            }
        }
    }

    fn load(&mut self, other: &dyn Channel) {
        let other = other
            .as_any()
            .downcast_ref::<DagChannel>()
            .expect("load() called with mismatched channel variant");
        self.data_predecessors = other.data_predecessors.clone();
        self.control_predecessors = other.control_predecessors.clone();
        self.resolved_controls = other.resolved_controls.clone();
        self.skipped = other.skipped.clone();
        self.is_skipped = other.is_skipped;
        self.consumed = other.consumed;
        self.values.clear();
    }

    fn snapshot(&self) -> ChannelSnapshot {
        let dag_values = self
            .values
            .iter()
            .filter_map(|(k, v)| match v {
                Value::Single(j) => Some((k.clone(), j.clone())),
                Value::Stream(_) => None,
            })
            .collect();
        ChannelSnapshot {
            dag_values,
            dag_resolved_controls: self.resolved_controls.clone(),
            dag_skipped: self.skipped.clone(),
            dag_consumed: self.consumed,
            ..Default::default()
        }
    }

    fn restore(&mut self, snapshot: ChannelSnapshot) {
        self.values = snapshot
            .dag_values
            .into_iter()
            .map(|(k, v)| (k, Value::Single(v)))
            .collect();
        self.resolved_controls = snapshot.dag_resolved_controls;
        self.skipped = snapshot.dag_skipped;
        self.consumed = snapshot.dag_consumed;
        self.is_skipped = self.recompute_skip() || self.is_skipped;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
