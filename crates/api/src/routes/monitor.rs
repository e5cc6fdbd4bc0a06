//! Route definitions for the live resource views.

use axum::routing::get;
use axum::Router;

use crate::handlers::monitor;
use crate::state::AppState;

/// Routes mounted at `/monitor`.
///
/// ```text
/// GET /cpu       -> cpu
/// GET /memory    -> memory
/// GET /disk      -> disk
/// GET /network   -> network
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cpu", get(monitor::cpu))
        .route("/memory", get(monitor::memory))
        .route("/disk", get(monitor::disk))
        .route("/network", get(monitor::network))
}
