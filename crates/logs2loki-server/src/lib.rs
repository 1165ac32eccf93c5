// Server mode - HTTP proxy in front of a Loki push endpoint
//
// Runs anywhere a long-lived process fits:
// - Docker containers
// - Kubernetes
// - Local development
//
// Features:
// - Axum HTTP server (HTTP/1.1, HTTP/2), one handler for every path
// - reqwest client shared across requests
// - Structured logging with tracing
// - Graceful shutdown

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use logs2loki_config::RuntimeConfig;
use logs2loki_core::{Clock, SystemClock};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod dispatch;
mod handlers;
mod init;

use handlers::{health_check, proxy};
pub use init::init_tracing;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    config: Arc<RuntimeConfig>,
    client: reqwest::Client,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("logs2loki/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            client,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for defaulted timestamps.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

/// Build the router: `/health` plus the proxy on every other path and method.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check).fallback(proxy))
        .fallback(proxy)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point for server mode, loading configuration from the environment
pub async fn run() -> Result<()> {
    let config = RuntimeConfig::load().context("Failed to load configuration")?;
    run_with_config(config).await
}

/// Run the server with an already-resolved configuration
pub async fn run_with_config(config: RuntimeConfig) -> Result<()> {
    init_tracing(&config);

    let addr = config
        .server
        .as_ref()
        .map(|s| s.listen_addr.clone())
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());

    info!(
        mode = %config.request.mode,
        max_payload_bytes = config.request.max_payload_bytes,
        "Server mode - proxying log submissions to Loki"
    );
    match config.loki.target() {
        Ok(target) => info!("Forwarding to {}", target.push_url()),
        Err(e) => error!("{}; push requests will fail until this is fixed", e),
    }

    let app = router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Routes:");
    info!("  POST http://{}/        - Submit logs", addr);
    info!("  GET  http://{}/health  - Health check", addr);
    info!("Press Ctrl+C or send SIGTERM to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}
