//! [`AlertStore`] backed by PostgreSQL.

use async_trait::async_trait;

use hostwatch_core::alert::{
    Alert, AlertHistory, AlertKey, AlertStatistics, AlertStatus, AlertTransition, NewAlert,
    NewAlertHistory, NewSystemEvent, SystemEvent,
};
use hostwatch_core::error::CoreError;
use hostwatch_core::rule::{AlertRule, NewAlertRule};
use hostwatch_core::store::{AlertStore, StoreError, StoreResult};
use hostwatch_core::types::{DbId, Timestamp};

use crate::repositories::{
    AlertHistoryRepo, AlertRepo, AlertRuleRepo, ConfigRepo, SystemEventRepo,
};
use crate::DbPool;

/// Thin adapter from the repositories to the storage trait.
///
/// Alert writes that touch more than one table run in a single transaction;
/// dropping it on an early return rolls everything back.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Map a driver error into the storage error space.
///
/// Unique violations become [`StoreError::Conflict`]; everything else is a
/// backend failure.
pub(crate) fn backend(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

/// A row held a value the domain types reject (e.g. an unknown status).
fn corrupt(err: CoreError) -> StoreError {
    StoreError::Backend(format!("invalid row: {err}"))
}

fn convert<R, T>(row: R) -> StoreResult<T>
where
    T: TryFrom<R, Error = CoreError>,
{
    T::try_from(row).map_err(corrupt)
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = CoreError>,
{
    rows.into_iter().map(convert).collect()
}

#[async_trait]
impl AlertStore for PgStore {
    async fn open_alert(&self, alert: NewAlert) -> StoreResult<Alert> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = AlertRepo::create(&mut tx, &alert).await.map_err(backend)?;
        let opened: Alert = convert(row)?;
        AlertHistoryRepo::insert(&mut tx, &NewAlertHistory::created(&opened))
            .await
            .map_err(backend)?;
        SystemEventRepo::insert(&mut tx, &NewSystemEvent::alert_created(&opened))
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(opened)
    }

    async fn refresh_alert(
        &self,
        id: DbId,
        value: f64,
        at: Timestamp,
    ) -> StoreResult<Option<Alert>> {
        AlertRepo::refresh(&self.pool, id, value, at)
            .await
            .map_err(backend)?
            .map(convert)
            .transpose()
    }

    async fn transition_alert(&self, change: &AlertTransition) -> StoreResult<Option<Alert>> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let Some(row) = AlertRepo::transition(&mut tx, change)
            .await
            .map_err(backend)?
        else {
            return Ok(None);
        };
        let alert: Alert = convert(row)?;
        AlertHistoryRepo::insert(&mut tx, &change.history())
            .await
            .map_err(backend)?;
        if let Some(event) = change.event(&alert) {
            SystemEventRepo::insert(&mut tx, &event)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(Some(alert))
    }

    async fn get_active_alert_by_key(&self, key: &AlertKey) -> StoreResult<Option<Alert>> {
        AlertRepo::find_active_by_key(&self.pool, key)
            .await
            .map_err(backend)?
            .map(convert)
            .transpose()
    }

    async fn get_alert_by_id(&self, id: DbId) -> StoreResult<Option<Alert>> {
        AlertRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .map(convert)
            .transpose()
    }

    async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Alert>> {
        let rows = AlertRepo::list(&self.pool, status, limit, offset)
            .await
            .map_err(backend)?;
        convert_all(rows)
    }

    async fn alert_statistics(&self, since: Timestamp) -> StoreResult<AlertStatistics> {
        AlertRepo::statistics(&self.pool, since)
            .await
            .map(AlertStatistics::from)
            .map_err(backend)
    }

    async fn list_alert_history(&self, alert_id: DbId) -> StoreResult<Vec<AlertHistory>> {
        let rows = AlertHistoryRepo::list_for_alert(&self.pool, alert_id)
            .await
            .map_err(backend)?;
        convert_all(rows)
    }

    async fn list_system_events(&self, limit: i64, offset: i64) -> StoreResult<Vec<SystemEvent>> {
        let rows = SystemEventRepo::list(&self.pool, limit, offset)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(SystemEvent::from).collect())
    }

    async fn list_rules_for_host(&self, hostname: &str) -> StoreResult<Vec<AlertRule>> {
        let rows = AlertRuleRepo::list_enabled_for_host(&self.pool, hostname)
            .await
            .map_err(backend)?;
        convert_all(rows)
    }

    async fn list_rules(&self) -> StoreResult<Vec<AlertRule>> {
        let rows = AlertRuleRepo::list(&self.pool).await.map_err(backend)?;
        convert_all(rows)
    }

    async fn get_rule(&self, id: DbId) -> StoreResult<Option<AlertRule>> {
        AlertRuleRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .map(convert)
            .transpose()
    }

    async fn create_rule(&self, rule: NewAlertRule) -> StoreResult<AlertRule> {
        let row = AlertRuleRepo::create(&self.pool, &rule)
            .await
            .map_err(backend)?;
        convert(row)
    }

    async fn update_rule(&self, rule: &AlertRule) -> StoreResult<Option<AlertRule>> {
        AlertRuleRepo::update_settings(&self.pool, rule.id, rule.threshold, rule.enabled)
            .await
            .map_err(backend)?
            .map(convert)
            .transpose()
    }

    async fn delete_rule(&self, id: DbId) -> StoreResult<bool> {
        AlertRuleRepo::soft_delete(&self.pool, id)
            .await
            .map_err(backend)
    }

    async fn get_config_value(&self, key: &str) -> StoreResult<Option<String>> {
        ConfigRepo::get(&self.pool, key).await.map_err(backend)
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await.map_err(backend)
    }
}
