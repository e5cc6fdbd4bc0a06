//! Repository for the `system_events` table (append-only).

use sqlx::{PgPool, Postgres, Transaction};

use hostwatch_core::alert::NewSystemEvent;

use crate::models::system_event::SystemEventRow;

const COLUMNS: &str = "\
    id, event_type, severity, message, description, source, hostname, recorded_at";

pub struct SystemEventRepo;

impl SystemEventRepo {
    /// Append a row inside `tx`, alongside the alert write it records.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        event: &NewSystemEvent,
    ) -> Result<SystemEventRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO system_events \
                (event_type, severity, message, description, source, hostname, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SystemEventRow>(&query)
            .bind(&event.event_type)
            .bind(&event.severity)
            .bind(&event.message)
            .bind(&event.description)
            .bind(&event.source)
            .bind(&event.hostname)
            .bind(event.timestamp)
            .fetch_one(&mut **tx)
            .await
    }

    /// Newest first.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SystemEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM system_events \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, SystemEventRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
