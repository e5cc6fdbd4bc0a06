//! Repository for the `alert_rules` table.

use sqlx::PgPool;

use hostwatch_core::rule::NewAlertRule;
use hostwatch_core::types::DbId;

use crate::models::alert_rule::AlertRuleRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, name, metric_type, operator, threshold, duration_secs, severity, \
    enabled, hostname, description, deleted_at, created_at, updated_at";

/// Provides CRUD operations for alert rules. Deletes are soft.
pub struct AlertRuleRepo;

impl AlertRuleRepo {
    pub async fn create(pool: &PgPool, input: &NewAlertRule) -> Result<AlertRuleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO alert_rules \
                (name, metric_type, operator, threshold, duration_secs, severity, \
                 enabled, hostname, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRuleRow>(&query)
            .bind(&input.name)
            .bind(input.metric_type.as_str())
            .bind(input.operator.as_str())
            .bind(input.threshold)
            .bind(input.duration_secs)
            .bind(input.severity.as_str())
            .bind(input.enabled)
            .bind(&input.hostname)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a live rule by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AlertRuleRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM alert_rules WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, AlertRuleRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All live rules, enabled or not, by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<AlertRuleRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM alert_rules WHERE deleted_at IS NULL ORDER BY id");
        sqlx::query_as::<_, AlertRuleRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Enabled live rules that are global or scoped to `hostname`.
    ///
    /// Host-scoped rules sort first (`hostname IS NULL` is `false` for them).
    pub async fn list_enabled_for_host(
        pool: &PgPool,
        hostname: &str,
    ) -> Result<Vec<AlertRuleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_rules \
             WHERE deleted_at IS NULL AND enabled \
               AND (hostname IS NULL OR hostname = $1) \
             ORDER BY (hostname IS NULL), id"
        );
        sqlx::query_as::<_, AlertRuleRow>(&query)
            .bind(hostname)
            .fetch_all(pool)
            .await
    }

    /// Update the mutable settings of a live rule.
    ///
    /// Returns `None` if no live rule with the given `id` exists.
    pub async fn update_settings(
        pool: &PgPool,
        id: DbId,
        threshold: f64,
        enabled: bool,
    ) -> Result<Option<AlertRuleRow>, sqlx::Error> {
        let query = format!(
            "UPDATE alert_rules SET threshold = $2, enabled = $3, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRuleRow>(&query)
            .bind(id)
            .bind(threshold)
            .bind(enabled)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a rule. Returns `true` if a live row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alert_rules SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
