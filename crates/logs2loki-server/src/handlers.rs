// HTTP request handlers for server mode
//
// Adapts axum requests to the shared handler and writes its decision back

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use logs2loki_core::resolve_client_ip;
use logs2loki_handlers::{
    handle, reject, request_id, Action, InboundRequest, ProxyError, ProxyResponse,
    REQUEST_ID_HEADER,
};
use http_body_util::LengthLimitError;
use serde_json::json;
use tracing::{field, info, info_span, warn, Instrument};

use crate::dispatch::send_push;
use crate::AppState;

/// GET /health - Basic health check
pub(crate) async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

/// Every other path and method - the log proxy
pub(crate) async fn proxy(
    State(state): State<AppState>,
    method: Method,
    query: Option<Query<Vec<(String, String)>>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let request_id = request_id(header(REQUEST_ID_HEADER));
    let client_ip = resolve_client_ip(header);
    let query = query.map(|Query(pairs)| pairs).unwrap_or_default();
    let declared_len = header("content-length").and_then(|v| v.parse::<usize>().ok());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        mode = %state.config.request.mode,
        entries = field::Empty,
        status = field::Empty,
    );

    async move {
        // Only POST bodies are read, and never past the configured limit
        let body = if method == Method::POST {
            let limit = state.config.request.max_payload_bytes;
            match read_body(body, declared_len, limit).await {
                Ok(body) => body,
                Err(err) => {
                    // Missing credentials outrank an oversized body
                    let err = state.config.loki.target().err().map_or(err, ProxyError::from);
                    return finish(reject(&err, &request_id));
                }
            }
        } else {
            Bytes::new()
        };

        let inbound = InboundRequest {
            method: method.as_str(),
            query: &query,
            client_ip: &client_ip,
            body: &body,
            request_id: &request_id,
        };

        let response = match handle(&state.config, &inbound, &*state.clock) {
            Action::Respond(response) => response,
            Action::Forward(push) => match send_push(&state.client, push).await {
                Ok(upstream) => ProxyResponse::relay(upstream),
                Err(e) => reject(&ProxyError::from(e), &request_id),
            },
        };

        finish(response)
    }
    .instrument(span)
    .await
}

/// Buffer a request body of at most `limit` bytes.
async fn read_body(
    body: Body,
    declared_len: Option<usize>,
    limit: usize,
) -> Result<Bytes, ProxyError> {
    if let Some(size) = declared_len.filter(|&size| size > limit) {
        return Err(ProxyError::PayloadTooLarge {
            size: Some(size),
            limit,
        });
    }

    to_bytes(body, limit).await.map_err(|e| {
        let e = e.into_inner();
        if e.is::<LengthLimitError>() {
            ProxyError::PayloadTooLarge { size: None, limit }
        } else {
            ProxyError::BodyRead(e.to_string())
        }
    })
}

fn finish(response: ProxyResponse) -> Response {
    tracing::Span::current().record("status", response.status);
    info!("Request complete");
    into_axum(response)
}

fn into_axum(response: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut out = (status, Body::from(response.body)).into_response();

    let headers = out.headers_mut();
    for (name, value) in response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = name, "Dropping response header with invalid value"),
        }
    }
    out
}
