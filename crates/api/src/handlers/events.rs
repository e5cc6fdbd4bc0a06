use axum::extract::{Query, State};
use axum::Json;

use hostwatch_core::alert::SystemEvent;

use crate::error::AppResult;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /events?limit=&offset=
///
/// System events emitted by the alert lifecycle, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<SystemEvent>>>> {
    let events = state
        .alerts
        .system_events(params.limit(), params.offset())
        .await?;
    Ok(Json(DataResponse { data: events }))
}
