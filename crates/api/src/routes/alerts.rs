//! Route definitions for the alert lifecycle.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Routes mounted at `/alerts`.
///
/// ```text
/// GET  /                    -> list_alerts
/// GET  /statistics          -> statistics
/// GET  /{id}                -> get_alert
/// GET  /{id}/history        -> get_alert_history
/// POST /{id}/acknowledge    -> acknowledge
/// POST /{id}/resolve        -> resolve
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alerts::list_alerts))
        .route("/statistics", get(alerts::statistics))
        .route("/{id}", get(alerts::get_alert))
        .route("/{id}/history", get(alerts::get_alert_history))
        .route("/{id}/acknowledge", post(alerts::acknowledge))
        .route("/{id}/resolve", post(alerts::resolve))
}
