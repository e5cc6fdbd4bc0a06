//! `system_events` rows (append-only).

use sqlx::FromRow;

use hostwatch_core::alert::SystemEvent;
use hostwatch_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow)]
pub struct SystemEventRow {
    pub id: DbId,
    pub event_type: String,
    pub severity: String,
    pub message: String,
    pub description: String,
    pub source: String,
    pub hostname: String,
    pub recorded_at: Timestamp,
}

impl From<SystemEventRow> for SystemEvent {
    fn from(row: SystemEventRow) -> Self {
        SystemEvent {
            id: row.id,
            event_type: row.event_type,
            severity: row.severity,
            message: row.message,
            description: row.description,
            source: row.source,
            hostname: row.hostname,
            timestamp: row.recorded_at,
        }
    }
}
