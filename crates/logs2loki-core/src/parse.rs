//! Request body parsing for the supported ingest modes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Clock, LogEntry, ValidationError};

/// How a deployment interprets request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// JSON entries with optional metadata; query parameters ignored.
    Structured,
    /// Raw text body forwarded as a single line.
    Passthrough,
    /// JSON entries plus stream labels taken from query parameters.
    #[default]
    #[serde(alias = "labeled")]
    LabeledStructured,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMode::Structured => "structured",
            IngestMode::Passthrough => "passthrough",
            IngestMode::LabeledStructured => "labeled_structured",
        }
    }
}

impl std::fmt::Display for IngestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IngestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structured" | "json" => Ok(IngestMode::Structured),
            "passthrough" | "raw" | "text" => Ok(IngestMode::Passthrough),
            "labeled_structured" | "labeled" | "labels" => Ok(IngestMode::LabeledStructured),
            _ => Err(format!(
                "Unsupported ingest mode: {}. Supported: structured, passthrough, labeled",
                s
            )),
        }
    }
}

/// Parse a JSON body into validated log entries.
///
/// A bare object counts as a one-element array. Entries are checked in order
/// and the first violation rejects the whole body.
pub fn parse_structured(body: &[u8], clock: &dyn Clock) -> Result<Vec<LogEntry>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::EmptyBody);
    }

    let parsed: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;

    let raw_entries = match parsed {
        Value::Array(items) => items,
        other => vec![other],
    };
    if raw_entries.is_empty() {
        return Err(ValidationError::NoEntries);
    }

    raw_entries
        .into_iter()
        .enumerate()
        .map(|(index, raw)| parse_entry(index, raw, clock))
        .collect()
}

/// Wrap a raw text body as a single log line.
pub fn parse_passthrough(body: &[u8], clock: &dyn Clock) -> Result<LogEntry, ValidationError> {
    if body.is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    let text = std::str::from_utf8(body).map_err(|_| ValidationError::InvalidUtf8)?;
    Ok(LogEntry::new(clock.timestamp(), text))
}

fn parse_entry(index: usize, raw: Value, clock: &dyn Clock) -> Result<LogEntry, ValidationError> {
    let Value::Object(mut fields) = raw else {
        return Err(ValidationError::EntryNotObject { index });
    };

    let message = match fields.remove("message") {
        None | Some(Value::Null) => return Err(ValidationError::MissingMessage { index }),
        Some(Value::String(s)) if s.is_empty() => {
            return Err(ValidationError::MissingMessage { index })
        }
        Some(Value::String(s)) => s,
        Some(_) => return Err(ValidationError::InvalidMessage { index }),
    };

    let timestamp = match fields.remove("timestamp") {
        None | Some(Value::Null) => clock.timestamp(),
        Some(Value::String(s)) if s.is_empty() => clock.timestamp(),
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) if n.is_u64() => n.to_string(),
        Some(_) => return Err(ValidationError::InvalidTimestamp { index }),
    };

    let metadata = match fields.remove("metadata") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => validate_metadata(index, map)?,
        Some(_) => return Err(ValidationError::InvalidMetadata { index }),
    };

    Ok(LogEntry {
        timestamp,
        message,
        metadata,
    })
}

fn validate_metadata(
    index: usize,
    metadata: Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    if let Some((key, _)) = metadata
        .iter()
        .find(|(_, v)| matches!(v, Value::Object(_) | Value::Array(_)))
    {
        return Err(ValidationError::NestedMetadata {
            index,
            key: key.clone(),
        });
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedClock;

    const CLOCK: FixedClock = FixedClock::new(1_700_000_000_000_000_000);

    #[test]
    fn test_ingest_mode_from_str() {
        assert_eq!("structured".parse::<IngestMode>(), Ok(IngestMode::Structured));
        assert_eq!("RAW".parse::<IngestMode>(), Ok(IngestMode::Passthrough));
        assert_eq!(
            "labeled".parse::<IngestMode>(),
            Ok(IngestMode::LabeledStructured)
        );
        assert!("xml".parse::<IngestMode>().is_err());
        assert_eq!(IngestMode::default(), IngestMode::LabeledStructured);
    }

    #[test]
    fn test_bare_object_is_single_entry() {
        let entries = parse_structured(br#"{"message":"hello"}"#, &CLOCK).unwrap();
        assert_eq!(entries, vec![LogEntry::new("1700000000000000000", "hello")]);
    }

    #[test]
    fn test_array_preserves_order_and_timestamps() {
        let body = br#"[
            {"message": "a", "timestamp": "123"},
            {"message": "b"},
            {"message": "c", "timestamp": 456}
        ]"#;
        let entries = parse_structured(body, &CLOCK).unwrap();
        let pairs: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.timestamp.as_str(), e.message.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("123", "a"), ("1700000000000000000", "b"), ("456", "c")]
        );
    }

    #[test]
    fn test_missing_message_rejects_whole_submission() {
        let body = br#"[{"message":"ok"},{"level":"info"},{"message":"also ok"}]"#;
        assert_eq!(
            parse_structured(body, &CLOCK),
            Err(ValidationError::MissingMessage { index: 1 })
        );

        let body = br#"{"message":""}"#;
        assert_eq!(
            parse_structured(body, &CLOCK),
            Err(ValidationError::MissingMessage { index: 0 })
        );
    }

    #[test]
    fn test_message_must_be_string() {
        assert_eq!(
            parse_structured(br#"{"message": 42}"#, &CLOCK),
            Err(ValidationError::InvalidMessage { index: 0 })
        );
    }

    #[test]
    fn test_metadata_rules() {
        let body = br#"{"message":"m","metadata":{"level":"info","n":1,"ok":true,"x":null}}"#;
        let entries = parse_structured(body, &CLOCK).unwrap();
        assert_eq!(entries[0].metadata.len(), 4);

        let entries = parse_structured(br#"{"message":"m","metadata":null}"#, &CLOCK).unwrap();
        assert!(entries[0].metadata.is_empty());

        assert_eq!(
            parse_structured(br#"{"message":"m","metadata":["a"]}"#, &CLOCK),
            Err(ValidationError::InvalidMetadata { index: 0 })
        );
        assert_eq!(
            parse_structured(br#"{"message":"m","metadata":"level=info"}"#, &CLOCK),
            Err(ValidationError::InvalidMetadata { index: 0 })
        );
        assert_eq!(
            parse_structured(
                br#"[{"message":"m"},{"message":"m","metadata":{"ok":"1","req":{"id":1}}}]"#,
                &CLOCK
            ),
            Err(ValidationError::NestedMetadata {
                index: 1,
                key: "req".into()
            })
        );
        assert_eq!(
            parse_structured(br#"{"message":"m","metadata":{"tags":["a","b"]}}"#, &CLOCK),
            Err(ValidationError::NestedMetadata {
                index: 0,
                key: "tags".into()
            })
        );
    }

    #[test]
    fn test_invalid_timestamp_type() {
        assert_eq!(
            parse_structured(br#"{"message":"m","timestamp":-5}"#, &CLOCK),
            Err(ValidationError::InvalidTimestamp { index: 0 })
        );
        assert_eq!(
            parse_structured(br#"{"message":"m","timestamp":{"s":1}}"#, &CLOCK),
            Err(ValidationError::InvalidTimestamp { index: 0 })
        );
    }

    #[test]
    fn test_body_shape_errors() {
        assert_eq!(parse_structured(b"", &CLOCK), Err(ValidationError::EmptyBody));
        assert_eq!(parse_structured(b"  \n", &CLOCK), Err(ValidationError::EmptyBody));
        assert_eq!(parse_structured(b"[]", &CLOCK), Err(ValidationError::NoEntries));
        assert!(matches!(
            parse_structured(b"{oops", &CLOCK),
            Err(ValidationError::InvalidJson(_))
        ));
        assert_eq!(
            parse_structured(br#"[{"message":"a"}, "b"]"#, &CLOCK),
            Err(ValidationError::EntryNotObject { index: 1 })
        );
        assert_eq!(
            parse_structured(br#""just a string""#, &CLOCK),
            Err(ValidationError::EntryNotObject { index: 0 })
        );
    }

    #[test]
    fn test_passthrough() {
        let entry = parse_passthrough(b"plain text line", &CLOCK).unwrap();
        assert_eq!(entry, LogEntry::new("1700000000000000000", "plain text line"));
        assert_eq!(parse_passthrough(b"", &CLOCK), Err(ValidationError::EmptyBody));
        assert_eq!(
            parse_passthrough(&[0xff, 0xfe], &CLOCK),
            Err(ValidationError::InvalidUtf8)
        );
    }
}
