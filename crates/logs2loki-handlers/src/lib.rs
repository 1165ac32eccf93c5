//! Shared request handling for every logs2loki runtime
//!
//! The handler is synchronous and does no I/O: it decides whether a request
//! is answered directly or turned into a push for Loki. Runtimes (axum server,
//! Cloudflare Workers) own the HTTP client and call back into
//! [`ProxyResponse::relay`] or [`ProxyResponse::error`] with the outcome.

pub mod error;
pub mod response;

pub use error::{DispatchError, ErrorResponse, ProxyError};
pub use response::{ProxyResponse, UpstreamResponse};

use logs2loki_config::{ConfigError, RuntimeConfig, DEFAULT_DOCS_URL};
use logs2loki_core::{translate, Clock, PushRequest, Submission};
use tracing::{debug, warn, Span};

/// Header used to correlate a request across log lines and error bodies.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// An inbound request, already read off the wire by the runtime.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub method: &'a str,
    pub query: &'a [(String, String)],
    pub client_ip: &'a str,
    pub body: &'a [u8],
    pub request_id: &'a str,
}

/// Outcome of [`handle`].
#[derive(Debug)]
pub enum Action {
    /// Answer the caller directly.
    Respond(ProxyResponse),
    /// Send this push to Loki and relay the answer.
    Forward(PushRequest),
}

/// Route a request by method and, for POST, validate it into a push request.
pub fn handle(config: &RuntimeConfig, request: &InboundRequest<'_>, clock: &dyn Clock) -> Action {
    handle_loaded(Ok(config), request, clock)
}

/// Like [`handle`], for runtimes that resolve configuration per request.
///
/// A configuration that failed to load only fails POST; GET falls back to
/// [`DEFAULT_DOCS_URL`] and OPTIONS is always answered.
pub fn handle_loaded(
    config: Result<&RuntimeConfig, ConfigError>,
    request: &InboundRequest<'_>,
    clock: &dyn Clock,
) -> Action {
    match request.method {
        "GET" => {
            let location = config
                .as_ref()
                .map_or(DEFAULT_DOCS_URL, |c| c.request.docs_url.as_str());
            Action::Respond(ProxyResponse::redirect(location))
        }
        "OPTIONS" => Action::Respond(ProxyResponse::preflight()),
        "POST" => match config
            .map_err(ProxyError::from)
            .and_then(|config| prepare_push(config, request, clock))
        {
            Ok(push) => Action::Forward(push),
            Err(err) => Action::Respond(reject(&err, request.request_id)),
        },
        other => {
            let err = ProxyError::MethodNotAllowed {
                method: other.to_string(),
            };
            Action::Respond(reject(&err, request.request_id))
        }
    }
}

/// Render an error response, logging it at a level matching its class.
pub fn reject(err: &ProxyError, request_id: &str) -> ProxyResponse {
    if err.is_server_error() {
        warn!(
            request_id,
            error_type = err.error_type(),
            "Request failed: {}",
            err
        );
    } else {
        debug!(
            request_id,
            error_type = err.error_type(),
            "Request rejected: {}",
            err
        );
    }
    ProxyResponse::error(err, Some(request_id))
}

fn prepare_push(
    config: &RuntimeConfig,
    request: &InboundRequest<'_>,
    clock: &dyn Clock,
) -> Result<PushRequest, ProxyError> {
    // Credentials are checked before the body is looked at
    let target = config.loki.target()?;

    let limit = config.request.max_payload_bytes;
    if request.body.len() > limit {
        return Err(ProxyError::PayloadTooLarge {
            size: Some(request.body.len()),
            limit,
        });
    }

    let submission = Submission {
        body: request.body,
        query: request.query,
        client_ip: request.client_ip,
    };
    let payload = translate(config.request.mode, &submission, clock)?;

    // Runtimes open the request span with an empty `entries` field
    Span::current().record("entries", payload.entry_count());
    debug!(
        request_id = request.request_id,
        mode = %config.request.mode,
        entries = payload.entry_count(),
        "Prepared Loki push"
    );

    PushRequest::build(&target, &payload).map_err(|e| DispatchError::Encode(e.to_string()).into())
}

/// Honor a caller-supplied request id, or mint a fresh one.
pub fn request_id(header: Option<&str>) -> String {
    header
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .filter(|id| id.chars().all(|c| c.is_ascii_graphic()))
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
