//! Toolgate Server - Headless Daemon
//!
//! A pure Rust HTTP server that:
//! - Runs tool fetches through the egress pipeline on /v1/fetch
//!   (rate limiting → proxy selection → retries)
//! - Provides a REST API for proxy pool management on /api/proxies
//! - Exposes /healthz and Prometheus metrics on /metrics
//!
//! Access via: http://localhost:8046

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod router;
mod server_utils;
mod state;

#[cfg(test)]
mod test_helpers;

use cli::Cli;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Toolgate Server v{} starting on port {}...", env!("CARGO_PKG_VERSION"), cli.port);

    toolgate_core::metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    let config = cli.gateway_config()?;
    let state = AppState::new(config)?;
    state.pipeline().start();
    info!("Egress pipeline started");

    let app = router::build_router(state.clone());
    let listener = server_utils::create_listener(&cli.bind, cli.port).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(server_utils::shutdown_signal())
        .await?;

    state.pipeline().shutdown().await;
    info!("Server stopped");
    Ok(())
}
