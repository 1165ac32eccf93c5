//! Stream labels: name grammar, query-parameter assembly and the labels the
//! proxy always stamps on a stream.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::{ValidationError, IP_LABEL, PROXY_LABEL, PROXY_LABEL_VALUE};

/// Trusted header set by the edge (Cloudflare) with the real client address.
pub const CONNECTING_IP_HEADER: &str = "cf-connecting-ip";

/// Standard forwarding header; the first hop is the original client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Sentinel used when no client address can be resolved.
pub const UNKNOWN_IP: &str = "unknown";

/// Check a label name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
///
/// Names that both start and end with `_` are reserved (`__name__` and
/// friends) and rejected, so `_foo` passes while `_foo_` does not.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if !(first.is_ascii_alphabetic() || first == '_' || first == ':') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':') {
        return false;
    }

    !(name.starts_with('_') && name.ends_with('_'))
}

/// Resolve the caller's address from request headers.
///
/// `get_header` receives lowercase header names. Preference order is the
/// edge's connecting-IP header, then the first `X-Forwarded-For` hop, then
/// [`UNKNOWN_IP`].
pub fn resolve_client_ip<'a, F>(get_header: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    if let Some(ip) = get_header(CONNECTING_IP_HEADER)
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return ip.to_string();
    }

    get_header(FORWARDED_FOR_HEADER)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Label name to value mapping for one stream.
///
/// Backed by a `BTreeMap` so the serialized stream selector is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a label set from query parameters, validating every name.
    ///
    /// The first invalid name aborts the whole set. Repeated keys keep the
    /// last value.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, ValidationError> {
        let mut labels = BTreeMap::new();
        for (name, value) in pairs {
            if !is_valid_label_name(name) {
                return Err(ValidationError::InvalidLabelName(name.clone()));
            }
            labels.insert(name.clone(), value.clone());
        }
        Ok(Self(labels))
    }

    /// Set the proxy identifier and client address, replacing any caller
    /// supplied values under the same names.
    pub fn inject_system_labels(&mut self, client_ip: &str) {
        self.0
            .insert(PROXY_LABEL.to_string(), PROXY_LABEL_VALUE.to_string());
        self.0.insert(IP_LABEL.to_string(), client_ip.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_label_name_grammar() {
        for ok in ["foo_bar", "_foo", "foo:bar", "foo", "F00", ":x", "foo_"] {
            assert!(is_valid_label_name(ok), "{ok} should be valid");
        }
        for bad in ["_foo_", "1foo", "", "_", "__name__", "foo-bar", "foo bar", "fóo"] {
            assert!(!is_valid_label_name(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_from_query_rejects_first_invalid_name() {
        let pairs = vec![
            ("app".to_string(), "web".to_string()),
            ("bad-name".to_string(), "x".to_string()),
            ("1foo".to_string(), "y".to_string()),
        ];
        assert_eq!(
            LabelSet::from_query(&pairs),
            Err(ValidationError::InvalidLabelName("bad-name".into()))
        );
    }

    #[test]
    fn test_system_labels_take_precedence() {
        let pairs = vec![
            ("proxy".to_string(), "mine".to_string()),
            ("ip".to_string(), "6.6.6.6".to_string()),
            ("env".to_string(), "prod".to_string()),
        ];
        let mut labels = LabelSet::from_query(&pairs).unwrap();
        labels.inject_system_labels("192.0.2.10");

        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get("proxy"), Some(PROXY_LABEL_VALUE));
        assert_eq!(labels.get("ip"), Some("192.0.2.10"));
        assert_eq!(labels.get("env"), Some("prod"));
    }

    #[test]
    fn test_resolve_client_ip_preference() {
        let mut headers = HashMap::new();
        headers.insert(FORWARDED_FOR_HEADER, "203.0.113.5, 10.0.0.1");
        assert_eq!(
            resolve_client_ip(|name| headers.get(name).copied()),
            "203.0.113.5"
        );

        headers.insert(CONNECTING_IP_HEADER, "198.51.100.7");
        assert_eq!(
            resolve_client_ip(|name| headers.get(name).copied()),
            "198.51.100.7"
        );

        let empty: HashMap<&str, &str> = HashMap::new();
        assert_eq!(resolve_client_ip(|name| empty.get(name).copied()), UNKNOWN_IP);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut labels = LabelSet::new();
        labels.inject_system_labels("unknown");
        let value = serde_json::to_value(&labels).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"ip": "unknown", "proxy": PROXY_LABEL_VALUE})
        );
    }
}
