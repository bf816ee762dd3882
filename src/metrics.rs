//! Optional Prometheus metrics exposition.
//!
//! Installs the metrics-rs Prometheus recorder and serves the rendered
//! text format over HTTP. The endpoint only reads snapshots; absence of
//! this collaborator never affects core behavior.

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Install the process-wide Prometheus recorder.
///
/// Only one recorder can be installed per process.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Serve `GET /metrics` and `GET /healthz` until the token is cancelled.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(handle: PrometheusHandle, port: u16, cancel: CancellationToken) -> Result<()> {
    let app = Router::new()
        .route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        )
        .route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("cannot bind metrics port {port}"))?;
    info!("metrics server listening on :{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .context("metrics server failed")
}
