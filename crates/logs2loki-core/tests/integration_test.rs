// Integration tests for logs2loki-core
//
// Tests the complete workflow from a raw submission to the push request body

use logs2loki_core::{
    translate, FixedClock, IngestMode, LokiTarget, PushRequest, Submission, ValidationError,
    PROXY_LABEL_VALUE,
};
use serde_json::{json, Value};

const NOW: i64 = 1_705_327_800_000_000_000; // 2024-01-15 14:30:00 UTC

fn target() -> LokiTarget {
    LokiTarget {
        host: "loki.internal".to_string(),
        port: 3100,
        username: "tenant".to_string(),
        password: "secret".to_string(),
        tenant_id: None,
    }
}

fn push_body(mode: IngestMode, body: &[u8], query: &[(String, String)]) -> Value {
    let submission = Submission {
        body,
        query,
        client_ip: "203.0.113.9",
    };
    let payload = translate(mode, &submission, &FixedClock::new(NOW)).expect("valid submission");
    let request = PushRequest::build(&target(), &payload).expect("serializable payload");
    assert_eq!(request.url, "http://loki.internal:3100/loki/api/v1/push");
    serde_json::from_slice(&request.body).expect("push body is JSON")
}

#[test]
fn test_single_object_submission() {
    let body = push_body(IngestMode::Structured, br#"{"message":"hello"}"#, &[]);
    assert_eq!(
        body,
        json!({"streams": [{
            "stream": {"proxy": PROXY_LABEL_VALUE, "ip": "203.0.113.9"},
            "values": [["1705327800000000000", "hello"]],
        }]})
    );
}

#[test]
fn test_mixed_metadata_submission() {
    let body = push_body(
        IngestMode::Structured,
        br#"[{"message":"a","metadata":{"level":"info"}},{"message":"b"}]"#,
        &[],
    );
    let values = body["streams"][0]["values"].as_array().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(
        values[0],
        json!(["1705327800000000000", "a", {"level": "info"}])
    );
    assert_eq!(values[1], json!(["1705327800000000000", "b"]));
}

#[test]
fn test_empty_metadata_yields_pair() {
    let body = push_body(
        IngestMode::Structured,
        br#"{"message":"a","metadata":{}}"#,
        &[],
    );
    assert_eq!(
        body["streams"][0]["values"][0],
        json!(["1705327800000000000", "a"])
    );
}

#[test]
fn test_entry_count_matches_input() {
    let entries: Vec<Value> = (0..25)
        .map(|i| json!({"message": format!("line {i}"), "timestamp": format!("{i}")}))
        .collect();
    let raw = serde_json::to_vec(&entries).unwrap();

    let body = push_body(IngestMode::Structured, &raw, &[]);
    let values = body["streams"][0]["values"].as_array().unwrap();
    assert_eq!(values.len(), 25);
    for (i, value) in values.iter().enumerate() {
        assert_eq!(value[0], json!(i.to_string()));
        assert_eq!(value[1], json!(format!("line {i}")));
    }
}

#[test]
fn test_labeled_submission() {
    let query = vec![
        ("app".to_string(), "checkout".to_string()),
        ("region:zone".to_string(), "eu-1a".to_string()),
        ("ip".to_string(), "127.0.0.1".to_string()),
    ];
    let body = push_body(
        IngestMode::LabeledStructured,
        br#"{"message":"paid"}"#,
        &query,
    );
    assert_eq!(
        body["streams"][0]["stream"],
        json!({
            "app": "checkout",
            "region:zone": "eu-1a",
            "proxy": PROXY_LABEL_VALUE,
            "ip": "203.0.113.9",
        })
    );
}

#[test]
fn test_rejection_is_all_or_nothing() {
    let submission = Submission {
        body: br#"[{"message":"a"},{"message":"b","metadata":{"ctx":{"user":1}}}]"#,
        query: &[],
        client_ip: "unknown",
    };
    let result = translate(IngestMode::Structured, &submission, &FixedClock::new(NOW));
    assert_eq!(
        result,
        Err(ValidationError::NestedMetadata {
            index: 1,
            key: "ctx".into()
        })
    );
}
