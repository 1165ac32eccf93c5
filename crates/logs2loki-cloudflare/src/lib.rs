//! Cloudflare Workers runtime adapter for logs2loki.
//!
//! Entry point is #[event(fetch)] macro, not main(). Each invocation resolves
//! configuration from the Worker `Env`, runs the shared handler and pushes to
//! Loki with `worker::Fetch`.

mod env;
mod request;

use tracing_subscriber::fmt::format::Pretty;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_web::{performance_layer, MakeConsoleWriter};
use worker::*;

/// Initialize tracing subscriber for Cloudflare Workers.
/// Uses tracing-web to output structured JSON logs to the Workers console.
#[event(start)]
fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true) // Put message at top level for $metadata.message in dashboard
        .with_ansi(false) // ANSI codes not supported in Workers console
        .with_timer(UtcTime::rfc_3339())
        .with_writer(MakeConsoleWriter);

    let perf_layer = performance_layer().with_details_from_fields(Pretty::default());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(perf_layer)
        .init();
}

/// Cloudflare Workers entry point.
#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    request::handle(req, env).await
}
