//! Storage abstraction for alerts, rules, history, events and config.
//!
//! The alert manager only talks to an [`AlertStore`]; the in-memory
//! [`MemoryStore`] backs tests and database-less deployments, and the
//! PostgreSQL implementation lives in `hostwatch-db`.

use std::time::Duration;

use async_trait::async_trait;

use crate::alert::{
    Alert, AlertHistory, AlertKey, AlertStatistics, AlertStatus, AlertTransition, NewAlert,
    SystemEvent,
};
use crate::rule::{AlertRule, NewAlertRule};
use crate::types::{DbId, Timestamp};

pub mod memory;

pub use memory::MemoryStore;

/// Failure reported by a storage backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    /// A uniqueness rule was violated (e.g. a second active alert per key).
    #[error("storage conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations needed by the alert lifecycle.
///
/// Lists are ordered by the implementation as documented per method so that
/// every backend returns identical pages. Alert writes are all-or-nothing:
/// an alert never changes status without its history entry, and vice versa.
#[async_trait]
pub trait AlertStore: Send + Sync + 'static {
    // -- alerts -------------------------------------------------------------

    /// Insert a new `active` alert together with its `created` history entry
    /// and `alert_created` system event.
    ///
    /// Returns [`StoreError::Conflict`] if an active alert already exists
    /// for the same key; nothing is written in that case.
    async fn open_alert(&self, alert: NewAlert) -> StoreResult<Alert>;

    /// Record the latest `value` of alert `id`, only while it is `active`.
    ///
    /// `None` if the alert is missing or has left `active`.
    async fn refresh_alert(
        &self,
        id: DbId,
        value: f64,
        at: Timestamp,
    ) -> StoreResult<Option<Alert>>;

    /// Apply `change` if the alert's current status is one of
    /// [`AlertTransition::expected`], writing its history entry and event in
    /// the same unit.
    ///
    /// `None` if the alert is missing or its status does not allow the
    /// change; nothing is written in that case.
    async fn transition_alert(&self, change: &AlertTransition) -> StoreResult<Option<Alert>>;

    async fn get_active_alert_by_key(&self, key: &AlertKey) -> StoreResult<Option<Alert>>;

    async fn get_alert_by_id(&self, id: DbId) -> StoreResult<Option<Alert>>;

    /// Newest first (`start_time DESC, id DESC`).
    async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Alert>>;

    /// Counters over all alerts; `resolved_today` counts end times `>= since`.
    async fn alert_statistics(&self, since: Timestamp) -> StoreResult<AlertStatistics>;

    // -- history and events ---------------------------------------------------

    /// Insertion order.
    async fn list_alert_history(&self, alert_id: DbId) -> StoreResult<Vec<AlertHistory>>;

    /// Newest first.
    async fn list_system_events(&self, limit: i64, offset: i64) -> StoreResult<Vec<SystemEvent>>;

    // -- rules ----------------------------------------------------------------

    /// Enabled, non-deleted rules that are global or scoped to `hostname`;
    /// host-scoped rules first, then by id.
    async fn list_rules_for_host(&self, hostname: &str) -> StoreResult<Vec<AlertRule>>;

    /// All non-deleted rules (enabled or not), by id.
    async fn list_rules(&self) -> StoreResult<Vec<AlertRule>>;

    async fn get_rule(&self, id: DbId) -> StoreResult<Option<AlertRule>>;

    async fn create_rule(&self, rule: NewAlertRule) -> StoreResult<AlertRule>;

    /// Persist `threshold` and `enabled`; `None` if the rule does not exist.
    async fn update_rule(&self, rule: &AlertRule) -> StoreResult<Option<AlertRule>>;

    /// Soft delete. Returns `false` if there was no live rule with `id`.
    async fn delete_rule(&self, id: DbId) -> StoreResult<bool>;

    // -- config ---------------------------------------------------------------

    async fn get_config_value(&self, key: &str) -> StoreResult<Option<String>>;

    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}
