//! # Probe Server
//!
//! Small HTTP server exposing controller metrics and Kubernetes probes:
//!
//! - `/metrics` - Prometheus text exposition of [`crate::observability::metrics::REGISTRY`]
//! - `/healthz` - Liveness, 200 while the process is up
//! - `/readyz` - Readiness, 200 only while the secret watch is running
//!
//! Listens on `METRICS_PORT` (5000 by default).

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Readiness flag shared between the watch loop and the probe handlers
#[derive(Debug, Default)]
pub struct ServerState {
    watching: AtomicBool,
}

impl ServerState {
    pub fn set_ready(&self, ready: bool) {
        self.watching.store(ready, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.watching.load(Ordering::Relaxed)
    }
}

#[must_use]
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the probe and metrics endpoints until the process exits
///
/// # Errors
///
/// Fails if the port cannot be bound or the server stops with an error.
pub async fn start_server(port: u16, state: Arc<ServerState>) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Probe server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Encode every registered metric in the Prometheus text format
///
/// # Errors
///
/// Fails if a metric family cannot be encoded.
pub fn render_metrics() -> Result<Vec<u8>, prometheus::Error> {
    let families = crate::observability::metrics::REGISTRY.gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    Ok(buffer)
}

async fn metrics_handler() -> impl IntoResponse {
    match render_metrics() {
        Ok(body) => (StatusCode::OK, [("content-type", METRICS_CONTENT_TYPE)], body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("failed to encode metrics: {e}").into_bytes(),
            )
        }
    }
}

async fn healthz_handler() -> StatusCode {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<ServerState>>) -> (StatusCode, &'static str) {
    if state.is_ready() {
        (StatusCode::OK, "watching")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not watching")
    }
}
