//! Alert lifecycle manager.
//!
//! Owns every write to alerts, alert history and system events. Each store
//! call is bounded by `call_timeout` so a stuck backend cannot wedge an
//! evaluation tick or an HTTP request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::evaluator::{self, RuleCheck, Transition};
use crate::alert::{
    Alert, AlertHistory, AlertKey, AlertStatistics, AlertStatus, AlertTransition, NewAlert,
    SystemEvent,
};
use crate::error::CoreError;
use crate::metric::MetricSnapshot;
use crate::rule::{self, AlertRule, CreateAlertRule};
use crate::store::{AlertStore, StoreError, StoreResult};
use crate::types::{start_of_day, DbId, Timestamp};

/// Default bound on a single store call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Counts for one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub rules_checked: usize,
    pub opened: usize,
    pub refreshed: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct AlertManager {
    store: Arc<dyn AlertStore>,
    call_timeout: Duration,
}

impl AlertManager {
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self {
            store,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.call_timeout)))
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Evaluate the rules for `snapshot.hostname` against `snapshot`.
    ///
    /// Fails only if the rules cannot be loaded. A failure while applying a
    /// single rule is logged, counted in [`EvaluationSummary::failed`], and
    /// the remaining rules are still applied.
    pub async fn evaluate(&self, snapshot: &MetricSnapshot) -> Result<EvaluationSummary, CoreError> {
        let rules = self
            .bounded(self.store.list_rules_for_host(&snapshot.hostname))
            .await?;
        Ok(self.evaluate_rules(snapshot, &rules, Utc::now()).await)
    }

    /// Apply already-loaded `rules` to `snapshot` as of `now`.
    pub async fn evaluate_rules(
        &self,
        snapshot: &MetricSnapshot,
        rules: &[AlertRule],
        now: Timestamp,
    ) -> EvaluationSummary {
        let checks = evaluator::check_rules(snapshot, rules);
        let mut summary = EvaluationSummary {
            rules_checked: checks.len(),
            ..Default::default()
        };

        for check in &checks {
            match self.apply_check(check, &snapshot.hostname, now).await {
                Ok(Transition::Open) => summary.opened += 1,
                Ok(Transition::Refresh) => summary.refreshed += 1,
                Ok(Transition::Nothing) => {}
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        rule_id = check.rule.id,
                        metric = %check.rule.metric_type,
                        severity = %check.rule.severity,
                        error = %e,
                        "Alert evaluation failed for rule",
                    );
                }
            }
        }

        summary
    }

    async fn apply_check(
        &self,
        check: &RuleCheck<'_>,
        hostname: &str,
        now: Timestamp,
    ) -> Result<Transition, CoreError> {
        let rule = check.rule;
        let key = AlertKey::new(rule.metric_type, rule.severity, hostname);
        let active = self.bounded(self.store.get_active_alert_by_key(&key)).await?;

        let step = evaluator::transition(check.breached, active.as_ref());
        match (step, active) {
            (Transition::Refresh, Some(alert)) => {
                let refreshed = self
                    .bounded(self.store.refresh_alert(alert.id, check.value, now))
                    .await?;
                // An operator acknowledged or resolved it since it was read.
                if refreshed.is_none() {
                    return Ok(Transition::Nothing);
                }
            }
            (Transition::Open, _) => {
                self.open_alert(rule, hostname, check.value, now).await?;
            }
            _ => {}
        }
        Ok(step)
    }

    async fn open_alert(
        &self,
        rule: &AlertRule,
        hostname: &str,
        value: f64,
        now: Timestamp,
    ) -> Result<Alert, CoreError> {
        let alert = self
            .bounded(
                self.store
                    .open_alert(NewAlert::from_breach(rule, hostname, value, now)),
            )
            .await?;

        tracing::warn!(
            alert_id = alert.id,
            hostname,
            metric = %alert.metric_type,
            severity = %alert.severity,
            value,
            threshold = alert.threshold,
            "Alert opened",
        );
        Ok(alert)
    }

    // -----------------------------------------------------------------------
    // Operator actions
    // -----------------------------------------------------------------------

    /// Move an active alert to `acknowledged`.
    pub async fn acknowledge(&self, id: DbId, message: &str) -> Result<Alert, CoreError> {
        let alert = self
            .apply(AlertTransition::acknowledge(id, message, Utc::now()))
            .await?;
        tracing::info!(alert_id = id, "Alert acknowledged");
        Ok(alert)
    }

    /// Move an active or acknowledged alert to `resolved`.
    pub async fn resolve(&self, id: DbId, message: &str) -> Result<Alert, CoreError> {
        let alert = self
            .apply(AlertTransition::resolve(id, message, Utc::now()))
            .await?;
        tracing::info!(alert_id = id, "Alert resolved");
        Ok(alert)
    }

    async fn apply(&self, change: AlertTransition) -> Result<Alert, CoreError> {
        if let Some(alert) = self.bounded(self.store.transition_alert(&change)).await? {
            return Ok(alert);
        }

        // Nothing matched: tell a missing alert apart from a status mismatch.
        let current = self.alert(change.alert_id).await?;
        Err(CoreError::Conflict(format!(
            "alert {} is {} and cannot become {}",
            change.alert_id, current.status, change.to
        )))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn alerts(
        &self,
        status: Option<AlertStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Alert>, CoreError> {
        Ok(self
            .bounded(self.store.list_alerts(status, limit, offset))
            .await?)
    }

    pub async fn alert(&self, id: DbId) -> Result<Alert, CoreError> {
        self.bounded(self.store.get_alert_by_id(id))
            .await?
            .ok_or(CoreError::NotFound { entity: "alert", id })
    }

    /// History trail of an alert in insertion order.
    pub async fn alert_history(&self, id: DbId) -> Result<Vec<AlertHistory>, CoreError> {
        self.alert(id).await?;
        Ok(self.bounded(self.store.list_alert_history(id)).await?)
    }

    pub async fn system_events(&self, limit: i64, offset: i64) -> Result<Vec<SystemEvent>, CoreError> {
        Ok(self
            .bounded(self.store.list_system_events(limit, offset))
            .await?)
    }

    /// Alert counters; `resolved_today` counts resolutions since UTC midnight.
    pub async fn statistics(&self) -> Result<AlertStatistics, CoreError> {
        let since = start_of_day(Utc::now());
        Ok(self.bounded(self.store.alert_statistics(since)).await?)
    }

    pub async fn config_value(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.bounded(self.store.get_config_value(key)).await?)
    }

    // -----------------------------------------------------------------------
    // Rule management
    // -----------------------------------------------------------------------

    pub async fn create_rule(&self, input: CreateAlertRule) -> Result<AlertRule, CoreError> {
        let new_rule = input.into_new_rule()?;
        let rule = self.bounded(self.store.create_rule(new_rule)).await?;
        tracing::info!(rule_id = rule.id, name = %rule.name, "Alert rule created");
        Ok(rule)
    }

    /// Live rules; with `hostname`, only those that apply to it (host-scoped
    /// first).
    pub async fn rules(&self, hostname: Option<&str>) -> Result<Vec<AlertRule>, CoreError> {
        let mut rules = self.bounded(self.store.list_rules()).await?;
        if let Some(host) = hostname {
            rules.retain(|r| r.applies_to(host));
            rules.sort_by_key(|r| (r.hostname.is_none(), r.id));
        }
        Ok(rules)
    }

    pub async fn rule(&self, id: DbId) -> Result<AlertRule, CoreError> {
        self.bounded(self.store.get_rule(id))
            .await?
            .ok_or(CoreError::NotFound {
                entity: "alert_rule",
                id,
            })
    }

    pub async fn update_rule_threshold(
        &self,
        id: DbId,
        threshold: f64,
    ) -> Result<AlertRule, CoreError> {
        rule::validate_threshold(threshold)?;
        let mut rule = self.rule(id).await?;
        rule.threshold = threshold;
        self.save_rule(rule).await
    }

    pub async fn set_rule_enabled(&self, id: DbId, enabled: bool) -> Result<AlertRule, CoreError> {
        let mut rule = self.rule(id).await?;
        rule.enabled = enabled;
        self.save_rule(rule).await
    }

    async fn save_rule(&self, rule: AlertRule) -> Result<AlertRule, CoreError> {
        let id = rule.id;
        self.bounded(self.store.update_rule(&rule))
            .await?
            .ok_or(CoreError::NotFound {
                entity: "alert_rule",
                id,
            })
    }

    /// Soft-delete a rule. Alerts it opened keep their history.
    pub async fn delete_rule(&self, id: DbId) -> Result<(), CoreError> {
        if !self.bounded(self.store.delete_rule(id)).await? {
            return Err(CoreError::NotFound {
                entity: "alert_rule",
                id,
            });
        }
        tracing::info!(rule_id = id, "Alert rule deleted");
        Ok(())
    }

    /// Insert the default rule set if the store has no live rules.
    ///
    /// Returns the number of rules inserted.
    pub async fn seed_default_rules(&self) -> Result<usize, CoreError> {
        if !self.bounded(self.store.list_rules()).await?.is_empty() {
            return Ok(0);
        }

        let defaults = rule::default_rules();
        let count = defaults.len();
        for new_rule in defaults {
            self.bounded(self.store.create_rule(new_rule)).await?;
        }
        tracing::info!(count, "Seeded default alert rules");
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
