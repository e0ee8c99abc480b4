//! Append-only trace log of tool invocations.

use crate::host::JsonObject;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceStream {
    AiTool,
    Main,
}

/// One (input, output) pair. `output` is `None` until the call completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub index: usize,
    pub stream: TraceStream,
    pub input: Vec<JsonObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<JsonObject>>,
}

/// The host's tracing boundary.
pub trait TraceSink: Send + Sync {
    /// Record an input batch; returns the index assigned to it.
    fn add_input_data(&self, stream: TraceStream, batch: Vec<JsonObject>) -> usize;

    /// Complete the entry at `index`. Entries are write-once.
    fn add_output_data(&self, stream: TraceStream, index: usize, batch: Vec<JsonObject>);
}

/// In-memory [`TraceSink`]. Index assignment and appends happen under one lock.
#[derive(Debug, Default)]
pub struct TraceLog {
    entries: Mutex<Vec<TraceEntry>>,
}

impl TraceLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self.entries()).unwrap_or(Value::Null)
    }
}

impl TraceSink for TraceLog {
    fn add_input_data(&self, stream: TraceStream, batch: Vec<JsonObject>) -> usize {
        let mut entries = self.entries.lock();
        let index = entries.len();
        entries.push(TraceEntry {
            index,
            stream,
            input: batch,
            output: None,
        });
        index
    }

    fn add_output_data(&self, stream: TraceStream, index: usize, batch: Vec<JsonObject>) {
        let mut entries = self.entries.lock();
        match entries.get_mut(index) {
            Some(entry) if entry.stream == stream && entry.output.is_none() => {
                entry.output = Some(batch);
            }
            Some(_) => tracing::warn!(index, ?stream, "trace output already written; ignoring"),
            None => tracing::warn!(index, ?stream, "no trace input at this index; ignoring"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn obj(v: Value) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn output_completes_the_matching_entry_once() {
        let log = TraceLog::new();
        let i = log.add_input_data(TraceStream::AiTool, vec![obj(json!({ "query": "q" }))]);
        log.add_output_data(TraceStream::AiTool, i, vec![obj(json!({ "success": true }))]);
        log.add_output_data(TraceStream::AiTool, i, vec![obj(json!({ "success": false }))]);

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].output.as_ref().unwrap()[0]["success"], true);
    }

    #[test]
    fn unknown_index_is_ignored() {
        let log = TraceLog::new();
        log.add_output_data(TraceStream::AiTool, 3, vec![]);
        assert!(log.is_empty());
    }

    #[test]
    fn concurrent_appends_get_distinct_indices() {
        let log = Arc::new(TraceLog::new());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    let i = log.add_input_data(TraceStream::AiTool, vec![obj(json!({ "n": n }))]);
                    log.add_output_data(TraceStream::AiTool, i, vec![obj(json!({ "n": n }))]);
                    i
                })
            })
            .collect();
        let mut indices: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());

        for entry in log.entries() {
            assert_eq!(entry.input, entry.output.unwrap());
        }
    }
}
