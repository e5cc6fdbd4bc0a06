//! `alert_rules` rows.

use sqlx::FromRow;

use hostwatch_core::error::CoreError;
use hostwatch_core::rule::AlertRule;
use hostwatch_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow)]
pub struct AlertRuleRow {
    pub id: DbId,
    pub name: String,
    pub metric_type: String,
    pub operator: String,
    pub threshold: f64,
    pub duration_secs: i32,
    pub severity: String,
    pub enabled: bool,
    pub hostname: Option<String>,
    pub description: String,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AlertRuleRow> for AlertRule {
    type Error = CoreError;

    fn try_from(row: AlertRuleRow) -> Result<Self, Self::Error> {
        Ok(AlertRule {
            id: row.id,
            name: row.name,
            metric_type: row.metric_type.parse()?,
            operator: row.operator.parse()?,
            threshold: row.threshold,
            duration_secs: row.duration_secs,
            severity: row.severity.parse()?,
            enabled: row.enabled,
            hostname: row.hostname,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
