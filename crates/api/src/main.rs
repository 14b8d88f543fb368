//! Room-Climate Feature Service - Main Entry Point

use anyhow::Context;
use api::{init_logging, serve, AppState, Settings};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(settings.log_format).map_err(|e| anyhow::anyhow!(e))?;

    info!("=== Room-Climate Feature Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Upstream {} (timeout {}s), calendar zone {}",
        settings.api_base_url, settings.api_request_timeout_seconds, settings.calendar_timezone
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let state = Arc::new(AppState::from_settings(&settings, Some(metrics))?);

    let addr = settings.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    serve(listener, state).await?;

    Ok(())
}
