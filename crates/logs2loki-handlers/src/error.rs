use logs2loki_config::ConfigError;
use logs2loki_core::ValidationError;
use serde::Serialize;
use thiserror::Error;

/// Failure while talking to the Loki backend.
///
/// Backend responses with an error status are not a `DispatchError`; those are
/// relayed to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Failed to encode push payload: {0}")]
    Encode(String),

    #[error("Failed to reach Loki at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Failed to read Loki response: {0}")]
    ResponseBody(String),
}

/// Every way a proxied request can fail, classified by HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    // 400-level: Client errors
    #[error("Method {method} not allowed")]
    MethodNotAllowed { method: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// `size` is unknown when a streamed body was cut off at the limit.
    #[error("{}", payload_too_large(.size, .limit))]
    PayloadTooLarge { size: Option<usize>, limit: usize },

    // 500-level: Server errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] DispatchError),
}

impl ProxyError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed { .. } => 405,
            Self::Validation(_) | Self::BodyRead(_) => 400,
            Self::PayloadTooLarge { .. } => 413,
            Self::Config(_) => 500,
            Self::Upstream(_) => 500,
        }
    }

    /// Error type string for responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "MethodNotAllowed",
            Self::Validation(_) | Self::BodyRead(_) => "InvalidRequest",
            Self::PayloadTooLarge { .. } => "PayloadTooLarge",
            Self::Config(_) => "ConfigError",
            Self::Upstream(_) => "UpstreamError",
        }
    }

    /// Human-readable message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Optional hint for fixing the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::PayloadTooLarge { .. } => Some(
                "Split the submission or increase LOGS2LOKI_MAX_PAYLOAD_BYTES".into(),
            ),
            Self::Config(ConfigError::MissingRequired { .. }) => {
                Some("Set the Loki credentials in the deployment environment".into())
            }
            _ => None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

fn payload_too_large(size: &Option<usize>, limit: &usize) -> String {
    match size {
        Some(size) => format!("Payload size {size} bytes exceeds limit of {limit} bytes"),
        None => format!("Payload exceeds limit of {limit} bytes"),
    }
}

/// Standardized JSON error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn from_error(error: &ProxyError, request_id: Option<&str>) -> Self {
        Self {
            error: error.error_type().to_string(),
            message: error.message(),
            details: error.hint(),
            request_id: request_id.map(str::to_string),
        }
    }
}
