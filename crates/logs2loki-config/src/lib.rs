// logs2loki-config - Unified configuration for all runtimes
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from LOGS2LOKI_CONFIG env var
// 3. Config file contents from LOGS2LOKI_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.logs2loki.toml)
// 5. Platform-specific defaults (lowest priority)

use anyhow::{Context, Result};
use logs2loki_core::{IngestMode, LokiTarget};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod env_overrides;
mod platform;
#[cfg(not(target_arch = "wasm32"))]
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use platform::Platform;

/// Default port; selects `https` for the push URL.
pub const DEFAULT_LOKI_PORT: u16 = 443;

/// Where `GET` requests are redirected.
pub const DEFAULT_DOCS_URL: &str = "https://github.com/logs2loki/logs2loki#readme";

/// Main runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub loki: LokiConfig,

    #[serde(default)]
    pub request: RequestConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

/// Loki backend coordinates.
///
/// Everything is optional at load time: a deployment with missing credentials
/// still starts, and each push request fails with a configuration error until
/// the operator fills them in.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LokiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl std::fmt::Debug for LokiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LokiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password_set", &self.password.is_some())
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Missing or unusable backend settings, reported per request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "Loki configuration incomplete: required environment variables not set: {}",
        missing_vars.join(", ")
    )]
    MissingRequired { missing_vars: Vec<&'static str> },

    /// Configuration could not be loaded at all (bad port, unknown mode, malformed TOML).
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl LokiConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_LOKI_PORT)
    }

    /// Resolve the push target, listing every missing required variable.
    pub fn target(&self) -> std::result::Result<LokiTarget, ConfigError> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        let host = present(&self.host);
        let username = present(&self.username);
        let password = present(&self.password);

        let (Some(host), Some(username), Some(password)) = (host, username, password) else {
            let missing_vars = [
                ("LOKI_HOST", host.is_none()),
                ("LOKI_USERNAME", username.is_none()),
                ("LOKI_PASSWORD", password.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, missing)| missing.then_some(name))
            .collect();
            return Err(ConfigError::MissingRequired { missing_vars });
        };

        Ok(LokiTarget {
            host: host.to_string(),
            port: self.port(),
            username: username.to_string(),
            password: password.to_string(),
            tenant_id: present(&self.tenant_id).map(str::to_string),
        })
    }

    /// Overlay values present in `other`.
    fn merge(&mut self, other: LokiConfig) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.username.is_some() {
            self.username = other.username;
        }
        if other.password.is_some() {
            self.password = other.password;
        }
        if other.tenant_id.is_some() {
            self.tenant_id = other.tenant_id;
        }
    }
}

/// Request handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub mode: IngestMode,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    #[serde(default = "default_docs_url")]
    pub docs_url: String,
}

fn default_max_payload_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_docs_url() -> String {
    DEFAULT_DOCS_URL.to_string()
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            mode: IngestMode::default(),
            max_payload_bytes: default_max_payload_bytes(),
            docs_url: default_docs_url(),
        }
    }
}

/// A config file layer. Keys left out keep the value of the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub loki: LokiConfig,
    #[serde(default)]
    pub request: RequestOverrides,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

/// The `[request]` table of a [`ConfigFile`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestOverrides {
    pub mode: Option<IngestMode>,
    pub max_payload_bytes: Option<usize>,
    pub docs_url: Option<String>,
}

impl RequestConfig {
    fn merge(&mut self, other: RequestOverrides) {
        if let Some(mode) = other.mode {
            self.mode = mode;
        }
        if let Some(max_payload_bytes) = other.max_payload_bytes {
            self.max_payload_bytes = max_payload_bytes;
        }
        if let Some(docs_url) = other.docs_url {
            self.docs_url = docs_url;
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Result<Self> {
        let platform = Platform::detect();
        sources::load_config(platform)
    }

    /// Load configuration for a specific platform (useful for testing)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_for_platform(platform: Platform) -> Result<Self> {
        sources::load_config(platform)
    }

    /// Load configuration from a specific file path (for CLI usage).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration with graceful fallback to defaults.
    /// Does not fail if config file is missing - uses platform defaults instead.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default(Platform::detect())
    }

    /// Construct a config that contains only platform defaults (no env or files).
    pub fn from_platform_defaults(platform: Platform) -> Self {
        let defaults = platform.defaults();

        RuntimeConfig {
            loki: LokiConfig::default(),
            request: RequestConfig {
                mode: IngestMode::default(),
                max_payload_bytes: defaults.max_payload_bytes,
                docs_url: default_docs_url(),
            },
            server: defaults.with_server.then(ServerConfig::default),
        }
    }

    /// Overlay a config file layer onto this config.
    pub fn merge(&mut self, other: ConfigFile) {
        self.loki.merge(other.loki);
        self.request.merge(other.request);

        if other.server.is_some() {
            self.server = other.server;
        }
    }

    /// Apply environment overrides from a custom source (e.g., WASM env).
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a configuration for the given platform using inline config content
    /// plus overrides supplied by an `EnvSource`. Intended for runtimes that
    /// cannot read files or host environment variables.
    pub fn load_for_platform_with_env<E: EnvSource>(
        platform: Platform,
        inline_config: Option<&str>,
        env: &E,
    ) -> Result<Self> {
        let mut config = RuntimeConfig::from_platform_defaults(platform);

        if let Some(inline) = inline_config {
            let file_config: ConfigFile =
                toml::from_str(inline).context("Failed to parse inline config content")?;
            config.merge(file_config);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
