//! In-process [`AlertStore`] used by tests and when no database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{AlertStore, StoreError, StoreResult};
use crate::alert::{
    Alert, AlertHistory, AlertKey, AlertStatistics, AlertStatus, AlertTransition, NewAlert,
    NewAlertHistory, NewSystemEvent, SystemEvent,
};
use crate::rule::{AlertRule, NewAlertRule, Severity};
use crate::types::{DbId, Timestamp};

#[derive(Debug)]
struct StoredRule {
    rule: AlertRule,
    deleted_at: Option<Timestamp>,
}

#[derive(Debug, Default)]
struct Tables {
    alerts: Vec<Alert>,
    history: Vec<AlertHistory>,
    events: Vec<SystemEvent>,
    rules: Vec<StoredRule>,
    config: HashMap<String, String>,
    next_id: DbId,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn push_history(&mut self, entry: NewAlertHistory) {
        let id = self.next_id();
        self.history.push(AlertHistory {
            id,
            alert_id: entry.alert_id,
            action: entry.action,
            message: entry.message,
            timestamp: entry.timestamp,
        });
    }

    fn push_event(&mut self, event: NewSystemEvent) {
        let id = self.next_id();
        self.events.push(SystemEvent {
            id,
            event_type: event.event_type,
            severity: event.severity,
            message: event.message,
            description: event.description,
            source: event.source,
            hostname: event.hostname,
            timestamp: event.timestamp,
        });
    }
}

/// All tables behind one lock, so each call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a monitoring config entry (e.g. `alert_check_interval`).
    pub async fn set_config(&self, key: impl Into<String>, value: impl Into<String>) {
        self.tables
            .lock()
            .await
            .config
            .insert(key.into(), value.into());
    }

    /// Number of alerts ever created, regardless of status.
    pub async fn alert_count(&self) -> usize {
        self.tables.lock().await.alerts.len()
    }
}

fn page<T>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn open_alert(&self, alert: NewAlert) -> StoreResult<Alert> {
        let mut t = self.tables.lock().await;
        let key = AlertKey::new(alert.metric_type, alert.severity, alert.hostname.clone());
        if t
            .alerts
            .iter()
            .any(|a| a.status == AlertStatus::Active && a.key() == key)
        {
            return Err(StoreError::Conflict(format!(
                "an active {} {} alert already exists for {}",
                key.severity, key.metric_type, key.hostname
            )));
        }

        let id = t.next_id();
        let opened = Alert {
            id,
            rule_id: alert.rule_id,
            hostname: alert.hostname,
            metric_type: alert.metric_type,
            severity: alert.severity,
            value: alert.value,
            threshold: alert.threshold,
            status: AlertStatus::Active,
            message: alert.message,
            description: alert.description,
            start_time: alert.start_time,
            end_time: None,
            updated_at: alert.start_time,
        };
        t.alerts.push(opened.clone());
        t.push_history(NewAlertHistory::created(&opened));
        t.push_event(NewSystemEvent::alert_created(&opened));
        Ok(opened)
    }

    async fn refresh_alert(
        &self,
        id: DbId,
        value: f64,
        at: Timestamp,
    ) -> StoreResult<Option<Alert>> {
        let mut t = self.tables.lock().await;
        let Some(stored) = t
            .alerts
            .iter_mut()
            .find(|a| a.id == id && a.status == AlertStatus::Active)
        else {
            return Ok(None);
        };
        stored.value = value;
        stored.updated_at = at;
        Ok(Some(stored.clone()))
    }

    async fn transition_alert(&self, change: &AlertTransition) -> StoreResult<Option<Alert>> {
        let mut t = self.tables.lock().await;
        let Some(stored) = t
            .alerts
            .iter_mut()
            .find(|a| a.id == change.alert_id && change.applies_to(a.status))
        else {
            return Ok(None);
        };
        *stored = change.apply(stored);
        let alert = stored.clone();

        t.push_history(change.history());
        if let Some(event) = change.event(&alert) {
            t.push_event(event);
        }
        Ok(Some(alert))
    }

    async fn get_active_alert_by_key(&self, key: &AlertKey) -> StoreResult<Option<Alert>> {
        let t = self.tables.lock().await;
        Ok(t
            .alerts
            .iter()
            .find(|a| a.status == AlertStatus::Active && &a.key() == key)
            .cloned())
    }

    async fn get_alert_by_id(&self, id: DbId) -> StoreResult<Option<Alert>> {
        let t = self.tables.lock().await;
        Ok(t.alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Alert>> {
        let t = self.tables.lock().await;
        let mut matching: Vec<&Alert> = t
            .alerts
            .iter()
            .filter(|a| status.map_or(true, |wanted| wanted == a.status))
            .collect();
        matching.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        Ok(page(matching.into_iter().cloned(), limit, offset))
    }

    async fn alert_statistics(&self, since: Timestamp) -> StoreResult<AlertStatistics> {
        let t = self.tables.lock().await;
        let mut stats = AlertStatistics::default();
        for alert in &t.alerts {
            stats.total += 1;
            match alert.status {
                AlertStatus::Active => {
                    stats.active += 1;
                    match alert.severity {
                        Severity::Critical => stats.critical += 1,
                        Severity::Warning => stats.warning += 1,
                    }
                }
                AlertStatus::Acknowledged => stats.acknowledged += 1,
                AlertStatus::Resolved => {
                    if alert.end_time.is_some_and(|end| end >= since) {
                        stats.resolved_today += 1;
                    }
                }
            }
        }
        Ok(stats)
    }

    async fn list_alert_history(&self, alert_id: DbId) -> StoreResult<Vec<AlertHistory>> {
        let t = self.tables.lock().await;
        Ok(t
            .history
            .iter()
            .filter(|h| h.alert_id == alert_id)
            .cloned()
            .collect())
    }

    async fn list_system_events(&self, limit: i64, offset: i64) -> StoreResult<Vec<SystemEvent>> {
        let t = self.tables.lock().await;
        Ok(page(t.events.iter().rev().cloned(), limit, offset))
    }

    async fn list_rules_for_host(&self, hostname: &str) -> StoreResult<Vec<AlertRule>> {
        let t = self.tables.lock().await;
        let mut rules: Vec<AlertRule> = t
            .rules
            .iter()
            .filter(|s| s.deleted_at.is_none() && s.rule.enabled && s.rule.applies_to(hostname))
            .map(|s| s.rule.clone())
            .collect();
        // Host-scoped (`Some`) before global (`None`), then by id.
        rules.sort_by_key(|r| (r.hostname.is_none(), r.id));
        Ok(rules)
    }

    async fn list_rules(&self) -> StoreResult<Vec<AlertRule>> {
        let t = self.tables.lock().await;
        Ok(t.rules
            .iter()
            .filter(|s| s.deleted_at.is_none())
            .map(|s| s.rule.clone())
            .collect())
    }

    async fn get_rule(&self, id: DbId) -> StoreResult<Option<AlertRule>> {
        let t = self.tables.lock().await;
        Ok(t.rules
            .iter()
            .find(|s| s.deleted_at.is_none() && s.rule.id == id)
            .map(|s| s.rule.clone()))
    }

    async fn create_rule(&self, rule: NewAlertRule) -> StoreResult<AlertRule> {
        let mut t = self.tables.lock().await;
        let id = t.next_id();
        let now = Utc::now();
        let created = AlertRule {
            id,
            name: rule.name,
            metric_type: rule.metric_type,
            operator: rule.operator,
            threshold: rule.threshold,
            duration_secs: rule.duration_secs,
            severity: rule.severity,
            enabled: rule.enabled,
            hostname: rule.hostname,
            description: rule.description,
            created_at: now,
            updated_at: now,
        };
        t.rules.push(StoredRule {
            rule: created.clone(),
            deleted_at: None,
        });
        Ok(created)
    }

    async fn update_rule(&self, rule: &AlertRule) -> StoreResult<Option<AlertRule>> {
        let mut t = self.tables.lock().await;
        let Some(stored) = t
            .rules
            .iter_mut()
            .find(|s| s.deleted_at.is_none() && s.rule.id == rule.id)
        else {
            return Ok(None);
        };
        stored.rule.threshold = rule.threshold;
        stored.rule.enabled = rule.enabled;
        stored.rule.updated_at = Utc::now();
        Ok(Some(stored.rule.clone()))
    }

    async fn delete_rule(&self, id: DbId) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t
            .rules
            .iter_mut()
            .find(|s| s.deleted_at.is_none() && s.rule.id == id)
        {
            Some(stored) => {
                stored.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_config_value(&self, key: &str) -> StoreResult<Option<String>> {
        let t = self.tables.lock().await;
        Ok(t.config.get(key).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
