// Logging/tracing setup for server mode

use logs2loki_config::{LogFormat, RuntimeConfig, ServerConfig};

/// Initialize tracing/logging from RuntimeConfig
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_server = ServerConfig::default();
    let server = config.server.as_ref().unwrap_or(&default_server);

    // Parse log level from config
    let env_filter =
        EnvFilter::try_new(&server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match server.log_format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}
