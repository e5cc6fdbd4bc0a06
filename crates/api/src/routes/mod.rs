pub mod alert_rules;
pub mod alerts;
pub mod events;
pub mod health;
pub mod monitor;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /monitor/cpu                        current CPU usage + history
/// /monitor/memory                     current memory usage + history
/// /monitor/disk                       current disk usage + partitions
/// /monitor/network                    current throughput + history
///
/// /alerts                             list (?status=&limit=&offset=)
/// /alerts/statistics                  counters
/// /alerts/{id}                        get
/// /alerts/{id}/history                lifecycle trail
/// /alerts/{id}/acknowledge            acknowledge (POST)
/// /alerts/{id}/resolve                resolve (POST)
///
/// /events                             system events (?limit=&offset=)
///
/// /alert-rules                        list (?host=), create (POST)
/// /alert-rules/{id}                   soft delete (DELETE)
/// /alert-rules/{id}/threshold         update threshold (PUT)
/// /alert-rules/{id}/enabled           enable / disable (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/monitor", monitor::router())
        .nest("/alerts", alerts::router())
        .nest("/events", events::router())
        .nest("/alert-rules", alert_rules::router())
}
