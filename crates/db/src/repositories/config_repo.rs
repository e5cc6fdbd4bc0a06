//! Repository for the `monitoring_config` key/value table.

use sqlx::PgPool;

pub struct ConfigRepo;

impl ConfigRepo {
    pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM monitoring_config WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Insert or overwrite a config entry.
    pub async fn upsert(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO monitoring_config (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }
}
