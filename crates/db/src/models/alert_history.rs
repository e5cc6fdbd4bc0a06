//! `alert_history` rows (append-only).

use sqlx::FromRow;

use hostwatch_core::alert::AlertHistory;
use hostwatch_core::error::CoreError;
use hostwatch_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow)]
pub struct AlertHistoryRow {
    pub id: DbId,
    pub alert_id: DbId,
    pub action: String,
    pub message: String,
    pub recorded_at: Timestamp,
}

impl TryFrom<AlertHistoryRow> for AlertHistory {
    type Error = CoreError;

    fn try_from(row: AlertHistoryRow) -> Result<Self, Self::Error> {
        Ok(AlertHistory {
            id: row.id,
            alert_id: row.alert_id,
            action: row.action.parse()?,
            message: row.message,
            timestamp: row.recorded_at,
        })
    }
}
