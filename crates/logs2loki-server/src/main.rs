use anyhow::{Context, Result};
use clap::Parser;
use logs2loki_config::{RuntimeConfig, ServerConfig};
use logs2loki_core::IngestMode;
use std::path::PathBuf;

/// HTTP proxy that validates log submissions and pushes them to Loki
#[derive(Parser)]
#[command(name = "logs2loki")]
#[command(version)]
#[command(about = "HTTP proxy that validates log submissions and pushes them to Loki", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP listen port (overrides config file)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Ingest mode: structured, passthrough, labeled
    #[arg(short, long, value_name = "MODE")]
    mode: Option<IngestMode>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build tokio runtime and run async server
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try default locations, fall back to defaults
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, &cli);
    config.validate().context("Invalid configuration")?;

    logs2loki_server::run_with_config(config).await
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        let server = config.server.get_or_insert_with(ServerConfig::default);
        server.listen_addr = format!("0.0.0.0:{}", port);
    }

    if let Some(mode) = cli.mode {
        config.request.mode = mode;
    }

    if let Some(level) = &cli.log_level {
        let server = config.server.get_or_insert_with(ServerConfig::default);
        server.log_level = level.clone();
    }
}
