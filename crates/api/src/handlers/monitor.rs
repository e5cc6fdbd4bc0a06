//! Handlers for the live resource views (`/monitor/*`).
//!
//! Each view pairs a fresh host reading with a copy of the recent history
//! collected by the sampling loop.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use hostwatch_core::metric::{DiskPartition, HistoryPoint, MetricKind, MetricSnapshot};
use hostwatch_core::types::Timestamp;

use crate::background::take_sample;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MemoryDetail {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct NetworkDetail {
    pub sent_per_sec: f64,
    pub recv_per_sec: f64,
}

/// Current value of one metric plus its recent history.
///
/// Disk usage is not sampled into history, so its `history` is always empty
/// and the per-partition breakdown is returned instead.
#[derive(Debug, Serialize)]
pub struct MetricReport {
    pub metric: MetricKind,
    pub hostname: String,
    pub current: f64,
    pub unit: &'static str,
    pub timestamp: Timestamp,
    pub history: Vec<HistoryPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<Vec<DiskPartition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkDetail>,
}

impl MetricReport {
    fn new(kind: MetricKind, snapshot: MetricSnapshot, history: Vec<HistoryPoint>) -> Self {
        let current = snapshot.value(kind);
        let MetricSnapshot {
            hostname,
            timestamp,
            memory_total_bytes,
            memory_used_bytes,
            partitions,
            network_sent_per_sec,
            network_recv_per_sec,
            ..
        } = snapshot;

        Self {
            metric: kind,
            hostname,
            current,
            unit: kind.unit().trim(),
            timestamp,
            history,
            memory: (kind == MetricKind::Memory).then(|| MemoryDetail {
                total_bytes: memory_total_bytes,
                used_bytes: memory_used_bytes,
            }),
            partitions: (kind == MetricKind::Disk).then_some(partitions),
            network: (kind == MetricKind::Network).then(|| NetworkDetail {
                sent_per_sec: network_sent_per_sec,
                recv_per_sec: network_recv_per_sec,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn report(state: &AppState, kind: MetricKind) -> AppResult<MetricReport> {
    let snapshot = take_sample(
        Arc::clone(&state.sampler),
        state.config.store_call_timeout(),
    )
    .await?;
    Ok(MetricReport::new(kind, snapshot, state.history.snapshot(kind)))
}

/// GET /monitor/cpu
pub async fn cpu(State(state): State<AppState>) -> AppResult<Json<DataResponse<MetricReport>>> {
    let data = report(&state, MetricKind::Cpu).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /monitor/memory
pub async fn memory(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MetricReport>>> {
    let data = report(&state, MetricKind::Memory).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /monitor/disk
pub async fn disk(State(state): State<AppState>) -> AppResult<Json<DataResponse<MetricReport>>> {
    let data = report(&state, MetricKind::Disk).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /monitor/network
///
/// `current` and the history values are sent plus received bytes per second.
pub async fn network(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MetricReport>>> {
    let data = report(&state, MetricKind::Network).await?;
    Ok(Json(DataResponse { data }))
}
