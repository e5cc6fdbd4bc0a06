use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use hostwatch_core::metric::MetricKind;
use hostwatch_core::ring_buffer::RingBuffer;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store is unreachable.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub store_healthy: bool,
    /// Number of samples currently held in the CPU history.
    pub samples: usize,
}

/// GET /health -- service liveness plus a bounded store ping.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ping = state.alerts.store().ping();
    let store_healthy = match tokio::time::timeout(state.config.store_call_timeout(), ping).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
        Err(_) => {
            tracing::warn!("Store health check timed out");
            false
        }
    };

    let status = if store_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store_healthy,
        samples: state
            .history
            .buffer(MetricKind::Cpu)
            .map_or(0, RingBuffer::len),
    })
}

/// Mount health check routes (root level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
