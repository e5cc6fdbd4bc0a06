//! `alerts` rows and the statistics aggregate.

use sqlx::FromRow;

use hostwatch_core::alert::{Alert, AlertStatistics};
use hostwatch_core::error::CoreError;
use hostwatch_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub id: DbId,
    pub rule_id: Option<DbId>,
    pub hostname: String,
    pub metric_type: String,
    pub severity: String,
    pub value: f64,
    pub threshold: f64,
    pub status: String,
    pub message: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl TryFrom<AlertRow> for Alert {
    type Error = CoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: row.id,
            rule_id: row.rule_id,
            hostname: row.hostname,
            metric_type: row.metric_type.parse()?,
            severity: row.severity.parse()?,
            value: row.value,
            threshold: row.threshold,
            status: row.status.parse()?,
            message: row.message,
            description: row.description,
            start_time: row.start_time,
            end_time: row.end_time,
            updated_at: row.updated_at,
        })
    }
}

/// Result of the single-pass `COUNT(*) FILTER (...)` statistics query.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct AlertStatisticsRow {
    pub total: i64,
    pub active: i64,
    pub critical: i64,
    pub warning: i64,
    pub acknowledged: i64,
    pub resolved_today: i64,
}

impl From<AlertStatisticsRow> for AlertStatistics {
    fn from(row: AlertStatisticsRow) -> Self {
        AlertStatistics {
            total: row.total,
            active: row.active,
            critical: row.critical,
            warning: row.warning,
            acknowledged: row.acknowledged,
            resolved_today: row.resolved_today,
        }
    }
}
