// Configuration validation
//
// Validates that values are sensible. Missing Loki credentials are NOT an
// error here; they are reported on each push request instead.

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_loki_config(&config.loki)?;
    validate_request_config(&config.request)?;

    if let Some(ref server) = config.server {
        validate_server_config(server)?;
    }

    Ok(())
}

fn validate_loki_config(config: &LokiConfig) -> Result<()> {
    if config.port == Some(0) {
        bail!("loki.port must be between 1 and 65535");
    }

    if let Some(host) = config.host.as_deref() {
        if host.contains("://") || host.contains('/') {
            bail!(
                "loki.host must be a bare hostname (got '{}'); the scheme is derived from loki.port",
                host
            );
        }
    }

    if config.password.is_some() && config.username.is_none() {
        warn!("loki.password is set but loki.username is not; pushes will be rejected");
    }

    Ok(())
}

fn validate_request_config(config: &RequestConfig) -> Result<()> {
    if config.max_payload_bytes == 0 {
        bail!("request.max_payload_bytes must be greater than 0");
    }

    // Warn about very large payloads
    if config.max_payload_bytes > 100 * 1024 * 1024 {
        // 100 MB
        warn!(
            max_payload_bytes = config.max_payload_bytes,
            "request.max_payload_bytes is very large; may cause issues"
        );
    }

    if !(config.docs_url.starts_with("https://") || config.docs_url.starts_with("http://")) {
        bail!("request.docs_url must be an absolute http(s) URL");
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.listen_addr.is_empty() {
        bail!("server.listen_addr must not be empty");
    }

    // Basic validation that it looks like an address
    if !config.listen_addr.contains(':') {
        bail!("server.listen_addr must be in format 'host:port'");
    }

    Ok(())
}
