use thiserror::Error;

/// A submission that cannot be forwarded as-is.
///
/// Every variant maps to a 400 response; the message names the rule that was
/// violated so callers can fix their payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body is empty")]
    EmptyBody,

    #[error("Request body must be valid UTF-8 text")]
    InvalidUtf8,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Request contains no log entries")]
    NoEntries,

    #[error("Log entry {index} must be a JSON object")]
    EntryNotObject { index: usize },

    #[error("Missing required field 'message' in log entry {index}")]
    MissingMessage { index: usize },

    #[error("Field 'message' in log entry {index} must be a string")]
    InvalidMessage { index: usize },

    #[error("Field 'timestamp' in log entry {index} must be a string or a non-negative integer")]
    InvalidTimestamp { index: usize },

    #[error("Field 'metadata' in log entry {index} must be a JSON object")]
    InvalidMetadata { index: usize },

    #[error("Metadata field '{key}' in log entry {index} must be a string, number, boolean or null")]
    NestedMetadata { index: usize, key: String },

    #[error(
        "Invalid label name '{0}': must match [a-zA-Z_:][a-zA-Z0-9_:]* and must not both start and end with '_'"
    )]
    InvalidLabelName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_violation() {
        let err = ValidationError::MissingMessage { index: 2 };
        assert_eq!(
            err.to_string(),
            "Missing required field 'message' in log entry 2"
        );

        let err = ValidationError::NestedMetadata {
            index: 0,
            key: "request".into(),
        };
        assert!(err.to_string().contains("'request'"));

        let err = ValidationError::InvalidLabelName("_foo_".into());
        assert!(err.to_string().contains("'_foo_'"));
    }
}
