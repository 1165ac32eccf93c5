use super::{LogFormat, RuntimeConfig, ServerConfig};
use anyhow::{anyhow, Result};
use logs2loki_core::IngestMode;

pub const ENV_PREFIX: &str = "LOGS2LOKI_";

/// Abstraction over environment-variable lookups so runtimes without `std::env`
/// can supply their own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the LOGS2LOKI_ prefix
    /// Used for the backend variables (LOKI_HOST, LOKI_PASSWORD, etc.)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Loki backend (unprefixed, matching the usual deployment variables)
    if let Some(host) = get_raw_env_string(env, "LOKI_HOST") {
        config.loki.host = Some(host);
    }
    if let Some(port) = get_raw_env_string(env, "LOKI_PORT") {
        let parsed = port
            .trim()
            .parse::<u16>()
            .map_err(|e| anyhow!("Failed to parse LOKI_PORT '{}': {}", port, e))?;
        config.loki.port = Some(parsed);
    }
    if let Some(username) = get_raw_env_string(env, "LOKI_USERNAME") {
        config.loki.username = Some(username);
    }
    if let Some(password) = get_raw_env_string(env, "LOKI_PASSWORD") {
        config.loki.password = Some(password);
    }
    if let Some(tenant_id) = get_raw_env_string(env, "LOKI_TENANT_ID") {
        config.loki.tenant_id = Some(tenant_id);
    }

    // Request handling
    if let Some(mode) = get_env_string(env, "INGEST_MODE") {
        config.request.mode = mode
            .parse::<IngestMode>()
            .map_err(|e| anyhow!("Invalid {}INGEST_MODE value: {}", ENV_PREFIX, e))?;
    }
    if let Some(val) = get_env_usize(env, "MAX_PAYLOAD_BYTES")? {
        config.request.max_payload_bytes = val;
    }
    if let Some(url) = get_env_string(env, "DOCS_URL") {
        config.request.docs_url = url;
    }

    // Server configuration (listen addr, log level/format)
    if let Some(addr) = get_env_string(env, "LISTEN_ADDR") {
        ensure_server(config).listen_addr = addr;
    }
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        ensure_server(config).log_level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        let parsed = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
        ensure_server(config).log_format = parsed;
    }

    Ok(())
}

fn ensure_server(config: &mut RuntimeConfig) -> &mut ServerConfig {
    config.server.get_or_insert_with(ServerConfig::default)
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

/// Get a raw environment variable without the LOGS2LOKI_ prefix
fn get_raw_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get_raw(key)
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Platform;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapEnv(HashMap<String, String>);

    impl MapEnv {
        fn with(mut self, key: &str, value: &str) -> Self {
            self.0.insert(key.to_string(), value.to_string());
            self
        }
    }

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(&format!("{}{}", ENV_PREFIX, key)).cloned()
        }

        fn get_raw(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    #[test]
    fn test_loki_variables() {
        let env = MapEnv::default()
            .with("LOKI_HOST", "logs-prod.grafana.net")
            .with("LOKI_PORT", "3100")
            .with("LOKI_USERNAME", "12345")
            .with("LOKI_PASSWORD", "glc_token")
            .with("LOKI_TENANT_ID", "team-a");

        let mut config = RuntimeConfig::from_platform_defaults(Platform::Server);
        apply_env_overrides(&mut config, &env).unwrap();

        let target = config.loki.target().unwrap();
        assert_eq!(target.host, "logs-prod.grafana.net");
        assert_eq!(target.port, 3100);
        assert_eq!(target.username, "12345");
        assert_eq!(target.password, "glc_token");
        assert_eq!(target.tenant_id.as_deref(), Some("team-a"));
        assert_eq!(target.scheme(), "http");

        // An explicit 443 switches the push URL to https
        let env = env.with("LOKI_PORT", "443");
        apply_env_overrides(&mut config, &env).unwrap();
        let target = config.loki.target().unwrap();
        assert_eq!(target.scheme(), "https");
        assert_eq!(
            target.push_url(),
            "https://logs-prod.grafana.net:443/loki/api/v1/push"
        );
    }

    #[test]
    fn test_invalid_port_fails() {
        let env = MapEnv::default().with("LOKI_PORT", "https");
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Server);
        let err = apply_env_overrides(&mut config, &env).unwrap_err();
        assert!(err.to_string().contains("LOKI_PORT"));
    }

    #[test]
    fn test_prefixed_overrides() {
        let env = MapEnv::default()
            .with("LOGS2LOKI_INGEST_MODE", "passthrough")
            .with("LOGS2LOKI_MAX_PAYLOAD_BYTES", "1024")
            .with("LOGS2LOKI_DOCS_URL", "https://example.com/docs")
            .with("LOGS2LOKI_LOG_FORMAT", "JSON");

        let mut config = RuntimeConfig::from_platform_defaults(Platform::CloudflareWorkers);
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.request.mode, IngestMode::Passthrough);
        assert_eq!(config.request.max_payload_bytes, 1024);
        assert_eq!(config.request.docs_url, "https://example.com/docs");
        assert_eq!(
            config.server.as_ref().map(|s| s.log_format),
            Some(LogFormat::Json)
        );
    }

    #[test]
    fn test_unknown_mode_fails() {
        let env = MapEnv::default().with("LOGS2LOKI_INGEST_MODE", "xml");
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Server);
        assert!(apply_env_overrides(&mut config, &env).is_err());
    }
}
