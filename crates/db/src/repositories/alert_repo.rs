//! Repository for the `alerts` table.

use sqlx::{PgPool, Postgres, Transaction};

use hostwatch_core::alert::{AlertKey, AlertStatus, AlertTransition, NewAlert};
use hostwatch_core::types::{DbId, Timestamp};

use crate::models::alert::{AlertRow, AlertStatisticsRow};

/// Column list for `alerts` SELECT / RETURNING clauses.
const COLUMNS: &str = "\
    id, rule_id, hostname, metric_type, severity, value, threshold, status, \
    message, description, start_time, end_time, updated_at";

pub struct AlertRepo;

impl AlertRepo {
    /// Insert a new `active` alert inside `tx`.
    ///
    /// Fails with a unique violation (`uq_alerts_active_key`) if an active
    /// alert already exists for the same key.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: &NewAlert,
    ) -> Result<AlertRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts \
                (rule_id, hostname, metric_type, severity, value, threshold, status, \
                 message, description, start_time, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'active', $7, $8, $9, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(input.rule_id)
            .bind(&input.hostname)
            .bind(input.metric_type.as_str())
            .bind(input.severity.as_str())
            .bind(input.value)
            .bind(input.threshold)
            .bind(&input.message)
            .bind(&input.description)
            .bind(input.start_time)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_active_by_key(
        pool: &PgPool,
        key: &AlertKey,
    ) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE metric_type = $1 AND severity = $2 AND hostname = $3 AND status = 'active'"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(key.metric_type.as_str())
            .bind(key.severity.as_str())
            .bind(&key.hostname)
            .fetch_optional(pool)
            .await
    }

    /// Record the latest value, only while the alert is still `active`.
    pub async fn refresh(
        pool: &PgPool,
        id: DbId,
        value: f64,
        at: Timestamp,
    ) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET value = $2, updated_at = $3 \
             WHERE id = $1 AND status = 'active' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(id)
            .bind(value)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Compare-and-set the status inside `tx`. Sets `end_time` when
    /// resolving. Returns `None` if the alert is missing or not in one of
    /// the expected statuses.
    pub async fn transition(
        tx: &mut Transaction<'_, Postgres>,
        change: &AlertTransition,
    ) -> Result<Option<AlertRow>, sqlx::Error> {
        let expected: Vec<&str> = change
            .expected()
            .into_iter()
            .map(AlertStatus::as_str)
            .collect();
        let query = format!(
            "UPDATE alerts SET \
                status = $3, \
                updated_at = $4, \
                end_time = CASE WHEN $3 = 'resolved' THEN $4 ELSE end_time END \
             WHERE id = $1 AND status = ANY($2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(change.alert_id)
            .bind(expected)
            .bind(change.to.as_str())
            .bind(change.at)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        status: Option<AlertStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AlertRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY start_time DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(status.map(AlertStatus::as_str))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Dashboard counters in a single scan.
    pub async fn statistics(
        pool: &PgPool,
        resolved_since: Timestamp,
    ) -> Result<AlertStatisticsRow, sqlx::Error> {
        sqlx::query_as::<_, AlertStatisticsRow>(
            "SELECT \
                COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE status = 'active') AS active, \
                COUNT(*) FILTER (WHERE status = 'active' AND severity = 'critical') AS critical, \
                COUNT(*) FILTER (WHERE status = 'active' AND severity = 'warning') AS warning, \
                COUNT(*) FILTER (WHERE status = 'acknowledged') AS acknowledged, \
                COUNT(*) FILTER (WHERE status = 'resolved' AND end_time >= $1) AS resolved_today \
             FROM alerts",
        )
        .bind(resolved_since)
        .fetch_one(pool)
        .await
    }
}
