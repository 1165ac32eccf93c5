// Runtime-neutral HTTP responses
//
// Adapters convert a ProxyResponse into their own response type
// (axum::Response, worker::Response) without touching status or headers.

use crate::error::{ErrorResponse, ProxyError};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";
pub const MAX_AGE_SECS: &str = "86400";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Response produced by the handler, ready to be written by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

/// What Loki answered, as seen by the adapter's HTTP client.
#[derive(Debug, Clone, Default)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ProxyResponse {
    fn new(status: u16) -> Self {
        Self {
            status,
            headers: vec![("access-control-allow-origin", ALLOW_ORIGIN.to_string())],
            body: Vec::new(),
        }
    }

    fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Add the method/header grants that accompany every POST response.
    fn with_post_cors(self) -> Self {
        self.with_header("access-control-allow-methods", ALLOW_METHODS)
            .with_header("access-control-allow-headers", ALLOW_HEADERS)
    }

    /// 302 to the documentation page.
    pub fn redirect(location: &str) -> Self {
        Self::new(302).with_header("location", location)
    }

    /// 204 CORS preflight answer with no body.
    pub fn preflight() -> Self {
        Self::new(204)
            .with_post_cors()
            .with_header("access-control-max-age", MAX_AGE_SECS)
    }

    /// JSON error body for `err`; POST failures keep the full CORS grant.
    pub fn error(err: &ProxyError, request_id: Option<&str>) -> Self {
        let body = ErrorResponse::from_error(err, request_id);
        // ErrorResponse is plain strings; fall back to the bare message if encoding ever fails
        let body = serde_json::to_vec(&body).unwrap_or_else(|_| err.message().into_bytes());

        let response = Self::new(err.status_code()).with_header("content-type", JSON_CONTENT_TYPE);
        let response = match err {
            ProxyError::MethodNotAllowed { .. } => {
                response.with_header("allow", "GET, POST, OPTIONS")
            }
            _ => response.with_post_cors(),
        };
        Self { body, ..response }
    }

    /// Relay Loki's answer to the caller: status and body unchanged.
    pub fn relay(upstream: UpstreamResponse) -> Self {
        let content_type = upstream
            .content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| TEXT_CONTENT_TYPE.to_string());

        Self {
            body: upstream.body,
            ..Self::new(upstream.status)
                .with_post_cors()
                .with_header("content-type", content_type)
        }
    }

    /// First header value named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
