// Outbound push to Loki over reqwest

use logs2loki_core::PushRequest;
use logs2loki_handlers::{DispatchError, UpstreamResponse};
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::debug;

/// Send `push` and capture whatever Loki answers, error statuses included.
pub(crate) async fn send_push(
    client: &Client,
    push: PushRequest,
) -> Result<UpstreamResponse, DispatchError> {
    let PushRequest { url, headers, body } = push;

    let mut request = client.post(&url).body(body);
    for (name, value) in headers {
        request = request.header(name, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| DispatchError::Unreachable {
            url: url.clone(),
            message: e.to_string(),
        })?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response
        .bytes()
        .await
        .map_err(|e| DispatchError::ResponseBody(e.to_string()))?;

    debug!(status, bytes = body.len(), "Loki responded");

    Ok(UpstreamResponse {
        status,
        content_type,
        body: body.to_vec(),
    })
}
