//! HTTP server exposing `/metrics` for Prometheus scraping and `/health` for
//! liveness checks, served alongside the search/graph API (§6.5).

use crate::error::Result;
use crate::metrics::MetricsRegistry;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start an HTTP server on `port` and run it until the process exits. Use
/// [`serve_metrics_with_addr`] in tests, where port 0 lets the OS assign a
/// free port.
pub async fn serve_metrics(port: u16) -> Result<()> {
    let (_, server_future) = serve_metrics_with_addr(port).await?;
    server_future.await
}

/// Bind a listener on `port` and return the bound address alongside a future
/// that serves `/metrics` and `/health` until awaited to completion.
pub async fn serve_metrics_with_addr(
    port: u16,
) -> Result<(std::net::SocketAddr, impl std::future::Future<Output = Result<()>>)> {
    let registry = MetricsRegistry::global();

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(registry);

    let addr = format!("0.0.0.0:{port}");
    let listener =
        TcpListener::bind(&addr).await.map_err(|e| crate::error::Error::Metrics(format!("failed to bind {addr}: {e}")))?;
    let local_addr =
        listener.local_addr().map_err(|e| crate::error::Error::Metrics(format!("failed to read local addr: {e}")))?;

    tracing::info!(%local_addr, "metrics server listening");

    let server_future = async move {
        axum::serve(listener, app).await.map_err(|e| crate::error::Error::Metrics(format!("server error: {e}")))?;
        Ok(())
    };

    Ok((local_addr, server_future))
}

async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    match registry.export() {
        Ok(metrics) => (StatusCode::OK, metrics).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to export metrics: {e}")).into_response(),
    }
}

async fn health_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}
