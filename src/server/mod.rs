//! Observability HTTP server for the long-running processes.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns 200 if the process is running
//! - `GET /metrics` - Prometheus scrape endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::metrics::Metrics;

pub mod health;

pub use health::health_handler;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        AppState { metrics }
    }
}

/// Prometheus scrape handler.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(app_state)
}

/// Serves the observability endpoints until `cancel` fires.
pub async fn serve(
    addr: SocketAddr,
    app_state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let app = build_router(app_state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("observability server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
