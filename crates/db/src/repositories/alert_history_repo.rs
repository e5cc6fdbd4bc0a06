//! Repository for the `alert_history` table (append-only).

use sqlx::{PgPool, Postgres, Transaction};

use hostwatch_core::alert::NewAlertHistory;
use hostwatch_core::types::DbId;

use crate::models::alert_history::AlertHistoryRow;

const COLUMNS: &str = "id, alert_id, action, message, recorded_at";

pub struct AlertHistoryRepo;

impl AlertHistoryRepo {
    /// Append a row inside `tx`, alongside the alert write it records.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        entry: &NewAlertHistory,
    ) -> Result<AlertHistoryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO alert_history (alert_id, action, message, recorded_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertHistoryRow>(&query)
            .bind(entry.alert_id)
            .bind(entry.action.as_str())
            .bind(&entry.message)
            .bind(entry.timestamp)
            .fetch_one(&mut **tx)
            .await
    }

    /// Trail for one alert in insertion order.
    pub async fn list_for_alert(
        pool: &PgPool,
        alert_id: DbId,
    ) -> Result<Vec<AlertHistoryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alert_history WHERE alert_id = $1 ORDER BY id");
        sqlx::query_as::<_, AlertHistoryRow>(&query)
            .bind(alert_id)
            .fetch_all(pool)
            .await
    }
}
