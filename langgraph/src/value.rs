//! The generic payload that flows through channels.
//!
//! Node actions, edge handlers and branch predicates all trade in [`Value`]:
//! either a single materialized `serde_json::Value` or a [`StreamReader`] of
//! them. Inputs and outputs are any-typed at the edges; every declared edge
//! carries a [`TypeDescriptor`] and `Value::assert_type` performs a validated
//! runtime check instead of a bare dynamic cast.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::GraphError;

/// A declared runtime type for an edge, used to validate values crossing it.
///
/// Construction-time validation of declared input/output types is out of
/// scope for the core (it belongs to the graph-construction API); this is
/// only the runtime check that a value observed on an edge matches what was
/// declared for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: &'static str,
}

impl TypeDescriptor {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// The "accept anything" descriptor, used for nodes that opted out of
    /// type-checked runtime conversions (`NodeCall::type_checked = false`).
    pub const ANY: TypeDescriptor = TypeDescriptor::new("any");
}

/// One element of a [`StreamReader`] sequence: either a value or the
/// distinguished end-of-source marker the merge policy injects per upstream
/// stream before the merged stream's final end.
#[derive(Debug, Clone)]
pub enum StreamItem {
    Item(serde_json::Value),
    /// One upstream of a merged stream has reached its own end. Not the
    /// merged stream's final end — that is signaled by `read_one` returning
    /// `None`.
    SourceEof,
}

/// The value that crosses a channel: a single materialized JSON value, or a
/// finite, restartable-by-copy stream of them.
#[derive(Clone)]
pub enum Value {
    Single(serde_json::Value),
    Stream(StreamReader),
}

impl Value {
    pub fn is_stream(&self) -> bool {
        matches!(self, Value::Stream(_))
    }

    /// Validates this value against a declared edge type. `TypeDescriptor::ANY`
    /// always accepts. Streams are checked by shape, not by draining them.
    pub fn assert_type(&self, to: &str, expected: &TypeDescriptor) -> Result<(), GraphError> {
        if expected.name == "any" {
            return Ok(());
        }
        let actual = match self {
            Value::Single(v) => json_type_name(v),
            Value::Stream(_) => "stream",
        };
        if actual != expected.name {
            return Err(GraphError::TypeMismatch {
                to: to.to_string(),
                expected: expected.name.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Closes this value if it is a stream, discarding any unread items.
    /// No-op for `Single`. Used when a predecessor is dropped because it was
    /// not declared — its stream value is closed immediately to avoid leaking it.
    pub async fn close(self) {
        if let Value::Stream(s) = self {
            s.close().await;
        }
    }
}

/// A finite, single-consumer, restartable-by-copy sequence of JSON values.
///
/// Backed by a shared buffer fed lazily from an underlying [`Source`]. The
/// underlying source is polled at most once per item, cooperatively, by
/// whichever clone reads past the buffered tail first; every other clone
/// then replays the buffered item instead of re-polling. `split` produces
/// independent cursors over the same buffer — a true duplicator, not
/// aliasing.
#[derive(Clone)]
pub struct StreamReader {
    core: Arc<StreamCore>,
    cursor: usize,
}

struct StreamCore {
    source: Mutex<Option<Box<dyn Source>>>,
    buffer: Mutex<VecDeque<StreamItem>>,
    /// Set once the underlying source has yielded `None`. Readers at the
    /// tail of the buffer who see this stop polling and return `None`.
    exhausted: AtomicBool,
}

/// The underlying one-shot producer a [`StreamReader`] wraps: an LLM token
/// stream, a sub-graph's output stream, or simply a fixed `Vec` for tests.
#[async_trait]
pub trait Source: Send {
    async fn next(&mut self) -> Option<StreamItem>;
}

/// Wraps a fixed, already-materialized sequence as a [`Source`]. Used to
/// seed a `StreamReader` from test fixtures or from a restored checkpoint,
/// which wraps a materialized value back into a single-element stream for
/// streaming runs.
pub struct VecSource(std::collections::vec_deque::IntoIter<StreamItem>);

impl VecSource {
    pub fn new(items: Vec<StreamItem>) -> Self {
        Self(std::collections::VecDeque::from(items).into_iter())
    }
}

#[async_trait]
impl Source for VecSource {
    async fn next(&mut self) -> Option<StreamItem> {
        self.0.next()
    }
}

impl StreamReader {
    pub fn new(source: Box<dyn Source>) -> Self {
        Self {
            core: Arc::new(StreamCore {
                source: Mutex::new(Some(source)),
                buffer: Mutex::new(VecDeque::new()),
                exhausted: AtomicBool::new(false),
            }),
            cursor: 0,
        }
    }

    pub fn from_values(items: Vec<serde_json::Value>) -> Self {
        Self::new(Box::new(VecSource::new(
            items.into_iter().map(StreamItem::Item).collect(),
        )))
    }

    /// Reads the next item, pulling from the underlying source only if this
    /// cursor has caught up to every other clone's.
    pub async fn read_one(&mut self) -> Option<StreamItem> {
        loop {
            {
                let buffer = self.core.buffer.lock().await;
                if let Some(item) = buffer.get(self.cursor) {
                    let item = item.clone();
                    drop(buffer);
                    self.cursor += 1;
                    return Some(item);
                }
                if self.core.exhausted.load(Ordering::Acquire) {
                    return None;
                }
            }
            // Buffer doesn't have our item yet; try to become the puller.
            let mut source_slot = self.core.source.lock().await;
            // Re-check under the source lock: another clone may have pulled
            // while we waited.
            {
                let buffer = self.core.buffer.lock().await;
                if buffer.get(self.cursor).is_some() || self.core.exhausted.load(Ordering::Acquire)
                {
                    continue;
                }
            }
            let Some(source) = source_slot.as_mut() else {
                self.core.exhausted.store(true, Ordering::Release);
                continue;
            };
            match source.next().await {
                Some(item) => {
                    self.core.buffer.lock().await.push_back(item);
                }
                None => {
                    self.core.exhausted.store(true, Ordering::Release);
                    *source_slot = None;
                }
            }
        }
    }

    /// Splits this reader into `n` independent copies, each a fresh consumer
    /// starting from this reader's current position. Consumes `self`.
    pub fn split(self, n: usize) -> Vec<StreamReader> {
        (0..n)
            .map(|_| StreamReader {
                core: self.core.clone(),
                cursor: self.cursor,
            })
            .collect()
    }

    /// Explicit discard: drops this handle without reading further. Does not
    /// tear down the underlying source, since other clones may still be
    /// reading it — only marks this cursor done.
    pub async fn close(self) {
        drop(self);
    }

    /// Drains the remainder of the stream into a `Vec` of materialized
    /// values, discarding any `SourceEof` markers. Used by
    /// `BranchEvaluator::collect` and by checkpoint capture's stream
    /// materialization step.
    pub async fn collect(mut self) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Some(item) = self.read_one().await {
            if let StreamItem::Item(v) = item {
                out.push(v);
            }
        }
        out
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Shallow-merges non-streaming JSON object values from multiple ready
/// predecessors. Key collisions across predecessors are rejected as errors;
/// non-object values with exactly one predecessor pass through unchanged.
pub fn merge_values(node: &str, values: Vec<serde_json::Value>) -> Result<serde_json::Value, GraphError> {
    if values.len() == 1 {
        return Ok(values.into_iter().next().unwrap());
    }
    let mut merged = serde_json::Map::new();
    for v in values {
        match v {
            serde_json::Value::Object(map) => {
                for (k, val) in map {
                    if merged.contains_key(&k) {
                        return Err(GraphError::node_msg(
                            node,
                            format!("merge conflict on key '{k}'"),
                        ));
                    }
                    merged.insert(k, val);
                }
            }
            other => {
                return Err(GraphError::node_msg(
                    node,
                    format!("cannot merge non-object value {other} with other ready inputs"),
                ));
            }
        }
    }
    Ok(serde_json::Value::Object(merged))
}

/// Merges multiple streaming inputs into one. When `source_eof_on_merge` is
/// set, each upstream's end is marked with a [`StreamItem::SourceEof`] before
/// the merged stream's own final end.
pub fn merge_streams(streams: Vec<StreamReader>, source_eof_on_merge: bool) -> StreamReader {
    if streams.len() == 1 && !source_eof_on_merge {
        return streams.into_iter().next().unwrap();
    }
    StreamReader::new(Box::new(MergeSource {
        streams,
        index: 0,
        source_eof_on_merge,
        done: Vec::new(),
    }))
}

struct MergeSource {
    streams: Vec<StreamReader>,
    index: usize,
    source_eof_on_merge: bool,
    done: Vec<bool>,
}

#[async_trait]
impl Source for MergeSource {
    async fn next(&mut self) -> Option<StreamItem> {
        if self.done.is_empty() {
            self.done = vec![false; self.streams.len()];
        }
        loop {
            if self.done.iter().all(|d| *d) {
                return None;
            }
            let n = self.streams.len();
            for step in 0..n {
                let i = (self.index + step) % n;
                if self.done[i] {
                    continue;
                }
                match self.streams[i].read_one().await {
                    Some(item) => {
                        self.index = (i + 1) % n;
                        return Some(item);
                    }
                    None => {
                        self.done[i] = true;
                        if self.source_eof_on_merge {
                            self.index = (i + 1) % n;
                            return Some(StreamItem::SourceEof);
                        }
                    }
                }
            }
        }
    }
}
