// Configuration source loading for native targets (non-WASM).
//
// Priority order:
// 1. Environment variables (LOKI_* and LOGS2LOKI_*)
// 2. Config file path from LOGS2LOKI_CONFIG
// 3. Inline config content from LOGS2LOKI_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.logs2loki.toml)
// 5. Platform defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::platform::Platform;
use crate::*;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_FILES: [&str; 2] = ["./config.toml", "./.logs2loki.toml"];

/// Load configuration for the detected platform using native environment/file access.
pub fn load_config(platform: Platform) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_platform_defaults(platform);

    if let Some(file_config) = load_from_file()? {
        config.merge(file_config);
    }

    finish(config)
}

fn load_from_file() -> Result<Option<ConfigFile>> {
    if let Ok(path) = env::var(format!("{}CONFIG", ENV_PREFIX)) {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var(format!("{}CONFIG_CONTENT", ENV_PREFIX)) {
        let config: ConfigFile = toml::from_str(&content)
            .context("Failed to parse inline config from LOGS2LOKI_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_FILES {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let file_config = read_config_file(path.as_ref())?;

    let mut config = RuntimeConfig::from_platform_defaults(Platform::detect());
    config.merge(file_config);

    finish(config)
}

/// Load configuration with graceful fallback to defaults.
/// Tries standard config file locations, returns platform defaults if none found.
pub fn load_or_default(platform: Platform) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_platform_defaults(platform);

    match load_from_file() {
        Ok(Some(file_config)) => config.merge(file_config),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable config file"),
    }

    finish(config)
}

fn finish(mut config: RuntimeConfig) -> Result<RuntimeConfig> {
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[loki]
host = "loki.internal"
port = 3100
username = "ops"
password = "hunter2"

[request]
mode = "structured"
max_payload_bytes = 4096

[server]
listen_addr = "127.0.0.1:9000"
log_level = "debug"
log_format = "json"
"#
        )
        .unwrap();

        let file_config = read_config_file(file.path()).unwrap();
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Server);
        config.merge(file_config);

        let target = config.loki.target().unwrap();
        assert_eq!(target.push_url(), "http://loki.internal:3100/loki/api/v1/push");
        assert_eq!(config.request.mode, IngestMode::Structured);
        assert_eq!(config.request.max_payload_bytes, 4096);

        let server = config.server.unwrap();
        assert_eq!(server.listen_addr, "127.0.0.1:9000");
        assert_eq!(server.log_format, LogFormat::Json);
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_read_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[loki\nhost = ").unwrap();
        let err = read_config_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
