//! Outbound push request assembly.
//!
//! Produces everything a platform HTTP client needs (URL, headers, body) so
//! the actual network call stays in the runtime adapters.

use base64::Engine;

use crate::PushPayload;

/// Loki ingestion endpoint.
pub const PUSH_PATH: &str = "/loki/api/v1/push";

/// Port that selects `https`; every other port talks plain `http`.
pub const HTTPS_PORT: u16 = 443;

/// Resolved backend coordinates and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct LokiTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sent as `X-Scope-OrgID` for multi-tenant Loki.
    pub tenant_id: Option<String>,
}

impl std::fmt::Debug for LokiTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LokiTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl LokiTarget {
    pub fn scheme(&self) -> &'static str {
        if self.port == HTTPS_PORT {
            "https"
        } else {
            "http"
        }
    }

    pub fn push_url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme(), self.host, self.port, PUSH_PATH)
    }

    /// `Authorization` header value: `Basic base64(username:password)`.
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }
}

/// A fully-formed push, ready to hand to an HTTP client.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl PushRequest {
    pub fn build(target: &LokiTarget, payload: &PushPayload) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(payload)?;

        let mut headers = vec![
            ("Authorization", target.authorization()),
            ("Content-Type", "application/json".to_string()),
        ];
        if let Some(tenant) = target.tenant_id.as_deref().filter(|t| !t.is_empty()) {
            headers.push(("X-Scope-OrgID", tenant.to_string()));
        }

        Ok(Self {
            url: target.push_url(),
            headers,
            body,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
