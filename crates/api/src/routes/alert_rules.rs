//! Route definitions for alert rule management.

use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::alert_rules;
use crate::state::AppState;

/// Routes mounted at `/alert-rules`.
///
/// ```text
/// GET    /                  -> list_rules
/// POST   /                  -> create_rule
/// DELETE /{id}              -> delete_rule
/// PUT    /{id}/threshold    -> update_threshold
/// PUT    /{id}/enabled      -> set_enabled
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(alert_rules::list_rules).post(alert_rules::create_rule),
        )
        .route("/{id}", delete(alert_rules::delete_rule))
        .route("/{id}/threshold", put(alert_rules::update_threshold))
        .route("/{id}/enabled", put(alert_rules::set_enabled))
}
