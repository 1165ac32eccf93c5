// Loki push API data model
//
// POST /loki/api/v1/push
// {"streams": [{"stream": {<labels>}, "values": [[ts, line], [ts, line, {<metadata>}]]}]}

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::LabelSet;

/// One validated log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Decimal nanoseconds since the Unix epoch.
    pub timestamp: String,
    pub message: String,
    /// Flat scalar map; empty means "no metadata".
    pub metadata: Map<String, Value>,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Encodes as a 2-element `[ts, line]` array, or `[ts, line, metadata]` when
/// the entry carries at least one metadata key.
impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_metadata = !self.metadata.is_empty();
        let mut seq = serializer.serialize_seq(Some(if with_metadata { 3 } else { 2 }))?;
        seq.serialize_element(&self.timestamp)?;
        seq.serialize_element(&self.message)?;
        if with_metadata {
            seq.serialize_element(&self.metadata)?;
        }
        seq.end()
    }
}

/// A label set with its ordered log lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stream {
    pub stream: LabelSet,
    pub values: Vec<LogEntry>,
}

/// Loki push request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushPayload {
    pub streams: Vec<Stream>,
}

impl PushPayload {
    /// Payload with a single stream, which is all the proxy ever sends.
    pub fn single(labels: LabelSet, values: Vec<LogEntry>) -> Self {
        Self {
            streams: vec![Stream {
                stream: labels,
                values,
            }],
        }
    }

    /// Total number of log lines across streams.
    pub fn entry_count(&self) -> usize {
        self.streams.iter().map(|s| s.values.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_without_metadata_is_pair() {
        let entry = LogEntry::new("1", "hello");
        assert_eq!(serde_json::to_value(&entry).unwrap(), json!(["1", "hello"]));
    }

    #[test]
    fn test_entry_with_metadata_is_triple() {
        let mut metadata = Map::new();
        metadata.insert("level".into(), json!("info"));
        metadata.insert("code".into(), json!(200));
        let entry = LogEntry::new("1", "hello").with_metadata(metadata);
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!(["1", "hello", {"level": "info", "code": 200}])
        );
    }

    #[test]
    fn test_entry_count() {
        let payload = PushPayload::single(
            LabelSet::new(),
            vec![LogEntry::new("1", "a"), LogEntry::new("2", "b")],
        );
        assert_eq!(payload.entry_count(), 2);
    }
}
