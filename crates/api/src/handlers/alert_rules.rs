//! Handlers for alert rule management (`/alert-rules`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use hostwatch_core::rule::{AlertRule, CreateAlertRule};
use hostwatch_core::types::DbId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RuleListParams {
    /// Only rules that apply to this host, host-scoped rules first.
    pub host: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdUpdate {
    pub threshold: f64,
}

#[derive(Debug, Deserialize)]
pub struct EnabledUpdate {
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /alert-rules?host=
pub async fn list_rules(
    State(state): State<AppState>,
    Query(params): Query<RuleListParams>,
) -> AppResult<Json<DataResponse<Vec<AlertRule>>>> {
    let host = params.host.as_deref().map(str::trim).filter(|h| !h.is_empty());
    let rules = state.alerts.rules(host).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// POST /alert-rules
pub async fn create_rule(
    State(state): State<AppState>,
    Json(input): Json<CreateAlertRule>,
) -> AppResult<impl IntoResponse> {
    let rule = state.alerts.create_rule(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// PUT /alert-rules/{id}/threshold
pub async fn update_threshold(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ThresholdUpdate>,
) -> AppResult<Json<DataResponse<AlertRule>>> {
    let rule = state
        .alerts
        .update_rule_threshold(id, input.threshold)
        .await?;
    tracing::info!(rule_id = id, threshold = rule.threshold, "Alert rule threshold updated");
    Ok(Json(DataResponse { data: rule }))
}

/// PUT /alert-rules/{id}/enabled
pub async fn set_enabled(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<EnabledUpdate>,
) -> AppResult<Json<DataResponse<AlertRule>>> {
    let rule = state.alerts.set_rule_enabled(id, input.enabled).await?;
    tracing::info!(rule_id = id, enabled = rule.enabled, "Alert rule toggled");
    Ok(Json(DataResponse { data: rule }))
}

/// DELETE /alert-rules/{id}
///
/// Soft delete; alerts the rule opened are kept.
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.alerts.delete_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
