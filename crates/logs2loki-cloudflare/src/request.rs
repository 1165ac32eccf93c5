//! HTTP request handling for the Cloudflare Worker.

use crate::env::load_worker_config;
use logs2loki_core::labels::{CONNECTING_IP_HEADER, FORWARDED_FOR_HEADER};
use logs2loki_core::{resolve_client_ip, Clock, PushRequest};
use logs2loki_handlers::{
    handle_loaded, reject, request_id, Action, DispatchError, InboundRequest,
    ProxyError, ProxyResponse, UpstreamResponse, REQUEST_ID_HEADER,
};
use tracing::{field, Instrument};
use worker::js_sys::Uint8Array;
use worker::*;

/// `SystemTime` is unavailable on wasm32; read the JS clock instead.
struct WorkerClock;

impl Clock for WorkerClock {
    fn now_nanos(&self) -> i64 {
        let millis = i64::try_from(Date::now().as_millis()).unwrap_or(i64::MAX / 1_000_000);
        millis.saturating_mul(1_000_000)
    }
}

fn header(req: &Request, name: &str) -> Option<String> {
    req.headers().get(name).ok().flatten()
}

fn query_pairs(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Handle one fetch event end to end.
pub(crate) async fn handle(mut req: Request, env: Env) -> Result<Response> {
    let request_id = request_id(header(&req, REQUEST_ID_HEADER).as_deref());
    let method = String::from(req.method());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        mode = field::Empty,
        entries = field::Empty,
        status = field::Empty,
    );

    async move {
        let response = match proxy(&mut req, &env, &method, &request_id).await {
            Ok(response) => response,
            Err(err) => reject(&err, &request_id),
        };

        tracing::Span::current().record("status", response.status);
        tracing::info!("Request complete");
        into_worker(response)
    }
    .instrument(span)
    .await
}

async fn proxy(
    req: &mut Request,
    env: &Env,
    method: &str,
    request_id: &str,
) -> std::result::Result<ProxyResponse, ProxyError> {
    // A broken configuration only fails POST; GET and OPTIONS are still answered
    let config = load_worker_config(env);
    if let Ok(config) = &config {
        tracing::Span::current().record("mode", config.request.mode.as_str());
    }

    let connecting_ip = header(req, CONNECTING_IP_HEADER);
    let forwarded_for = header(req, FORWARDED_FOR_HEADER);
    let client_ip = resolve_client_ip(|name| match name {
        CONNECTING_IP_HEADER => connecting_ip.as_deref(),
        FORWARDED_FOR_HEADER => forwarded_for.as_deref(),
        _ => None,
    });

    let query = req
        .url()
        .map(|url| query_pairs(&url))
        .map_err(|e| ProxyError::BodyRead(e.to_string()))?;

    // Only POST bodies are inspected, and only once credentials are known
    let body = if method == "POST" && config.is_ok() {
        req.bytes()
            .await
            .map_err(|e| ProxyError::BodyRead(e.to_string()))?
    } else {
        Vec::new()
    };

    let inbound = InboundRequest {
        method,
        query: &query,
        client_ip: &client_ip,
        body: &body,
        request_id,
    };

    match handle_loaded(config.as_ref().map_err(Clone::clone), &inbound, &WorkerClock) {
        Action::Respond(response) => Ok(response),
        Action::Forward(push) => Ok(ProxyResponse::relay(send_push(push).await?)),
    }
}

async fn send_push(push: PushRequest) -> std::result::Result<UpstreamResponse, DispatchError> {
    let PushRequest { url, headers, body } = push;
    let unreachable = |e: Error| DispatchError::Unreachable {
        url: url.clone(),
        message: e.to_string(),
    };

    let outbound_headers = Headers::new();
    for (name, value) in &headers {
        outbound_headers.set(name, value).map_err(unreachable)?;
    }

    let mut init = RequestInit::new();
    init.with_method(Method::Post)
        .with_headers(outbound_headers)
        .with_body(Some(Uint8Array::from(body.as_slice()).into()));

    let request = Request::new_with_init(&url, &init).map_err(unreachable)?;
    let mut response = Fetch::Request(request).send().await.map_err(unreachable)?;

    let status = response.status_code();
    let content_type = response.headers().get("content-type").ok().flatten();
    let body = response
        .bytes()
        .await
        .map_err(|e| DispatchError::ResponseBody(e.to_string()))?;

    tracing::debug!(status, bytes = body.len(), "Loki responded");

    Ok(UpstreamResponse {
        status,
        content_type,
        body,
    })
}

fn into_worker(response: ProxyResponse) -> Result<Response> {
    let headers = Headers::new();
    for (name, value) in &response.headers {
        headers.set(name, value)?;
    }

    let out = if response.body.is_empty() {
        Response::empty()?
    } else {
        Response::from_bytes(response.body)?
    };
    Ok(out.with_status(response.status).with_headers(headers))
}
