//! Configuration loading for Cloudflare Workers.

use logs2loki_config::{ConfigError, EnvSource, Platform, RuntimeConfig, ENV_PREFIX};
use worker::Env;

/// Environment source backed by Worker vars and secrets.
pub(crate) struct WorkerEnvSource<'a> {
    pub env: &'a Env,
}

/// Check if a key is likely to be a sensitive value that might be stored as a secret.
fn is_sensitive_key(key: &str) -> bool {
    key.contains("SECRET")
        || key.contains("TOKEN")
        || key.contains("PASSWORD")
        || key.contains("KEY")
        || key.contains("CREDENTIAL")
}

impl WorkerEnvSource<'_> {
    /// Var first, then secret for sensitive names.
    fn lookup(&self, binding: &str, sensitive: bool) -> Option<String> {
        if let Ok(val) = self.env.var(binding) {
            tracing::trace!(binding, "EnvSource: found var");
            return Some(val.to_string());
        }
        if sensitive {
            if let Ok(secret) = self.env.secret(binding) {
                tracing::trace!(binding, "EnvSource: found secret");
                return Some(secret.to_string());
            }
        }
        tracing::trace!(binding, "EnvSource: not set");
        None
    }
}

impl EnvSource for WorkerEnvSource<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.lookup(&format!("{}{}", ENV_PREFIX, key), is_sensitive_key(key))
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        self.lookup(key, is_sensitive_key(key))
    }
}

/// Resolve configuration for this invocation from inline TOML plus vars/secrets.
pub(crate) fn load_worker_config(env: &Env) -> Result<RuntimeConfig, ConfigError> {
    let provider = WorkerEnvSource { env };
    let inline = provider.get("CONFIG_CONTENT");

    RuntimeConfig::load_for_platform_with_env(
        Platform::CloudflareWorkers,
        inline.as_deref(),
        &provider,
    )
    .map_err(|e| {
        tracing::error!(error = ?e, "Failed to load configuration");
        ConfigError::Invalid(format!("{:#}", e))
    })
}
