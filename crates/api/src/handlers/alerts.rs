//! Handlers for the alert lifecycle endpoints (`/alerts`).

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use hostwatch_core::alert::{format_age, Alert, AlertHistory, AlertStatistics, AlertStatus};
use hostwatch_core::types::{DbId, Timestamp};

use crate::error::{AppError, AppResult};
use crate::query::{clamp_limit, clamp_offset};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /alerts`.
#[derive(Debug, Deserialize)]
pub struct AlertListParams {
    /// `active`, `acknowledged` or `resolved`; all statuses when absent.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for acknowledge and resolve. The body itself is optional;
/// without one the action is recorded with an empty message.
#[derive(Debug, Default, Deserialize)]
pub struct AlertActionRequest {
    #[serde(default)]
    pub message: String,
}

/// An alert as shown to operators, with a human-readable age.
#[derive(Debug, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    pub age: String,
}

impl AlertView {
    fn at(alert: Alert, now: Timestamp) -> Self {
        let until = alert.end_time.unwrap_or(now);
        let age = format_age(alert.start_time, until);
        Self { alert, age }
    }
}

fn views(alerts: Vec<Alert>) -> Vec<AlertView> {
    let now = Utc::now();
    alerts.into_iter().map(|a| AlertView::at(a, now)).collect()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /alerts?status=&limit=&offset=
///
/// Newest first.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertListParams>,
) -> AppResult<Json<DataResponse<Vec<AlertView>>>> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(AlertStatus::from_str)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let alerts = state
        .alerts
        .alerts(status, clamp_limit(params.limit), clamp_offset(params.offset))
        .await?;
    Ok(Json(DataResponse {
        data: views(alerts),
    }))
}

/// GET /alerts/statistics
pub async fn statistics(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<AlertStatistics>>> {
    let stats = state.alerts.statistics().await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /alerts/{id}
pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AlertView>>> {
    let alert = state.alerts.alert(id).await?;
    Ok(Json(DataResponse {
        data: AlertView::at(alert, Utc::now()),
    }))
}

/// GET /alerts/{id}/history
///
/// Oldest entry first.
pub async fn get_alert_history(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<AlertHistory>>>> {
    let history = state.alerts.alert_history(id).await?;
    Ok(Json(DataResponse { data: history }))
}

/// POST /alerts/{id}/acknowledge
pub async fn acknowledge(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<AlertActionRequest>>,
) -> AppResult<Json<DataResponse<AlertView>>> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let alert = state.alerts.acknowledge(id, &input.message).await?;
    Ok(Json(DataResponse {
        data: AlertView::at(alert, Utc::now()),
    }))
}

/// POST /alerts/{id}/resolve
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<AlertActionRequest>>,
) -> AppResult<Json<DataResponse<AlertView>>> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let alert = state.alerts.resolve(id, &input.message).await?;
    Ok(Json(DataResponse {
        data: AlertView::at(alert, Utc::now()),
    }))
}
