//! Alerts, their lifecycle, the history trail, and system events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::metric::MetricKind;
use crate::rule::{AlertRule, Severity};
use crate::types::{DbId, Timestamp};

/// Event type emitted when an alert is opened.
pub const EVENT_ALERT_CREATED: &str = "alert_created";
/// Event type emitted when an alert is resolved.
pub const EVENT_ALERT_RESOLVED: &str = "alert_resolved";
/// `source` recorded on events written by the alert manager.
pub const EVENT_SOURCE: &str = "alert_manager";
/// History message recorded when an alert is opened.
pub const CREATED_MESSAGE: &str = "created";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of an alert.
///
/// `Active -> Acknowledged -> Resolved`, or `Active -> Resolved` directly.
/// `Resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 3] = [
        AlertStatus::Active,
        AlertStatus::Acknowledged,
        AlertStatus::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Acknowledged)
                | (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AlertStatus::Active),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(CoreError::Validation(format!(
                "unknown alert status '{other}'"
            ))),
        }
    }
}

/// Action recorded in an alert's history trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Created,
    Acknowledged,
    Resolved,
}

impl AlertAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertAction::Created => "created",
            AlertAction::Acknowledged => "acknowledged",
            AlertAction::Resolved => "resolved",
        }
    }
}

impl FromStr for AlertAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(AlertAction::Created),
            "acknowledged" => Ok(AlertAction::Acknowledged),
            "resolved" => Ok(AlertAction::Resolved),
            other => Err(CoreError::Validation(format!(
                "unknown alert action '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// Identity of an alert for de-duplication: at most one active alert per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub metric_type: MetricKind,
    pub severity: Severity,
    pub hostname: String,
}

impl AlertKey {
    pub fn new(metric_type: MetricKind, severity: Severity, hostname: impl Into<String>) -> Self {
        Self {
            metric_type,
            severity,
            hostname: hostname.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: DbId,
    /// Rule that opened the alert; `None` once the rule row is gone.
    pub rule_id: Option<DbId>,
    pub hostname: String,
    pub metric_type: MetricKind,
    pub severity: Severity,
    /// Last observed value.
    pub value: f64,
    /// Threshold copied from the rule when the alert was opened.
    pub threshold: f64,
    pub status: AlertStatus,
    pub message: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl Alert {
    pub fn key(&self) -> AlertKey {
        AlertKey::new(self.metric_type, self.severity, self.hostname.clone())
    }
}

/// Insert payload for an alert. New alerts always start `active`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub rule_id: Option<DbId>,
    pub hostname: String,
    pub metric_type: MetricKind,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub description: String,
    pub start_time: Timestamp,
}

impl NewAlert {
    /// Build the alert opened by `rule` breaching with `value` on `hostname`.
    pub fn from_breach(rule: &AlertRule, hostname: &str, value: f64, now: Timestamp) -> Self {
        Self {
            rule_id: Some(rule.id),
            hostname: hostname.to_string(),
            metric_type: rule.metric_type,
            severity: rule.severity,
            value,
            threshold: rule.threshold,
            message: alert_message(rule, value),
            description: alert_description(rule, hostname, value),
            start_time: now,
        }
    }
}

/// Short, single-line summary, e.g. `CPU usage warning: 85.0% (threshold >= 80.0%)`.
pub fn alert_message(rule: &AlertRule, value: f64) -> String {
    let unit = rule.metric_type.unit();
    format!(
        "{} {}: {:.1}{unit} (threshold {} {:.1}{unit})",
        rule.metric_type.label(),
        rule.severity,
        value,
        rule.operator,
        rule.threshold,
    )
}

pub fn alert_description(rule: &AlertRule, hostname: &str, value: f64) -> String {
    let unit = rule.metric_type.unit();
    format!(
        "{} on {hostname} reached {:.1}{unit}, crossing the {} threshold of {:.1}{unit} \
         set by rule '{}'. Check the host and acknowledge or resolve this alert.",
        rule.metric_type.label(),
        value,
        rule.severity,
        rule.threshold,
        rule.name,
    )
}

/// Human-readable age of an alert, e.g. `45s`, `12m`, `3.5h`, `2.0d`.
pub fn format_age(start: Timestamp, now: Timestamp) -> String {
    let secs = (now - start).num_seconds().max(0) as f64;
    if secs < 60.0 {
        format!("{secs:.0}s")
    } else if secs < 3_600.0 {
        format!("{:.0}m", (secs / 60.0).floor())
    } else if secs < 86_400.0 {
        format!("{:.1}h", secs / 3_600.0)
    } else {
        format!("{:.1}d", secs / 86_400.0)
    }
}

// ---------------------------------------------------------------------------
// History and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertHistory {
    pub id: DbId,
    pub alert_id: DbId,
    pub action: AlertAction,
    pub message: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlertHistory {
    pub alert_id: DbId,
    pub action: AlertAction,
    pub message: String,
    pub timestamp: Timestamp,
}

impl NewAlertHistory {
    /// The entry written together with a newly opened `alert`.
    pub fn created(alert: &Alert) -> Self {
        Self {
            alert_id: alert.id,
            action: AlertAction::Created,
            message: CREATED_MESSAGE.to_string(),
            timestamp: alert.start_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemEvent {
    pub id: DbId,
    pub event_type: String,
    pub severity: String,
    pub message: String,
    pub description: String,
    pub source: String,
    pub hostname: String,
    pub timestamp: Timestamp,
}

/// Insert payload for a system event, built with the `with_*` helpers.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSystemEvent {
    pub event_type: String,
    pub severity: String,
    pub message: String,
    pub description: String,
    pub source: String,
    pub hostname: String,
    pub timestamp: Timestamp,
}

impl NewSystemEvent {
    /// Create an `info` event with only the required fields set.
    pub fn new(event_type: impl Into<String>, message: impl Into<String>, now: Timestamp) -> Self {
        Self {
            event_type: event_type.into(),
            severity: "info".to_string(),
            message: message.into(),
            description: String::new(),
            source: EVENT_SOURCE.to_string(),
            hostname: String::new(),
            timestamp: now,
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Event recorded when `alert` is opened.
    pub fn alert_created(alert: &Alert) -> Self {
        Self::new(EVENT_ALERT_CREATED, alert.message.clone(), alert.start_time)
            .with_severity(alert.severity.as_str())
            .with_description(alert.description.clone())
            .with_hostname(alert.hostname.clone())
    }

    /// Event recorded when `alert` is resolved with the operator's `note`.
    pub fn alert_resolved(alert: &Alert, note: &str, now: Timestamp) -> Self {
        Self::new(
            EVENT_ALERT_RESOLVED,
            format!("Alert resolved: {}", alert.message),
            now,
        )
        .with_description(note)
        .with_hostname(alert.hostname.clone())
    }
}

// ---------------------------------------------------------------------------
// Operator transitions
// ---------------------------------------------------------------------------

/// An operator status change.
///
/// Stores apply it as a compare-and-set: the status only changes if the
/// alert is currently in one of [`AlertTransition::expected`], and the
/// history entry (plus the `alert_resolved` event for resolves) is written
/// in the same unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTransition {
    pub alert_id: DbId,
    pub to: AlertStatus,
    pub message: String,
    pub at: Timestamp,
}

impl AlertTransition {
    pub fn acknowledge(alert_id: DbId, message: impl Into<String>, at: Timestamp) -> Self {
        Self {
            alert_id,
            to: AlertStatus::Acknowledged,
            message: message.into(),
            at,
        }
    }

    pub fn resolve(alert_id: DbId, message: impl Into<String>, at: Timestamp) -> Self {
        Self {
            alert_id,
            to: AlertStatus::Resolved,
            message: message.into(),
            at,
        }
    }

    /// Statuses an alert may hold for this change to apply. Empty for
    /// `active`, which nothing transitions back to.
    pub fn expected(&self) -> Vec<AlertStatus> {
        AlertStatus::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(self.to))
            .collect()
    }

    pub fn applies_to(&self, current: AlertStatus) -> bool {
        current.can_transition_to(self.to)
    }

    /// `alert` after the change: new status, `updated_at`, and `end_time`
    /// when resolving.
    pub fn apply(&self, alert: &Alert) -> Alert {
        let mut next = alert.clone();
        next.status = self.to;
        next.updated_at = self.at;
        if self.to == AlertStatus::Resolved {
            next.end_time = Some(self.at);
        }
        next
    }

    pub fn history(&self) -> NewAlertHistory {
        let action = match self.to {
            AlertStatus::Acknowledged => AlertAction::Acknowledged,
            AlertStatus::Resolved => AlertAction::Resolved,
            AlertStatus::Active => AlertAction::Created,
        };
        NewAlertHistory {
            alert_id: self.alert_id,
            action,
            message: self.message.clone(),
            timestamp: self.at,
        }
    }

    /// System event written alongside the change, if any.
    pub fn event(&self, alert: &Alert) -> Option<NewSystemEvent> {
        (self.to == AlertStatus::Resolved)
            .then(|| NewSystemEvent::alert_resolved(alert, &self.message, self.at))
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Dashboard counters over all alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertStatistics {
    pub total: i64,
    pub active: i64,
    /// Active alerts with critical severity.
    pub critical: i64,
    /// Active alerts with warning severity.
    pub warning: i64,
    pub acknowledged: i64,
    pub resolved_today: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::rule::Operator;

    fn cpu_rule() -> AlertRule {
        AlertRule {
            id: 7,
            name: "High CPU".into(),
            metric_type: MetricKind::Cpu,
            operator: Operator::Gt,
            threshold: 80.0,
            duration_secs: 0,
            severity: Severity::Warning,
            enabled: true,
            hostname: None,
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_forward_transitions_are_allowed() {
        use AlertStatus::*;
        assert!(Active.can_transition_to(Acknowledged));
        assert!(Active.can_transition_to(Resolved));
        assert!(Acknowledged.can_transition_to(Resolved));

        assert!(!Acknowledged.can_transition_to(Acknowledged));
        assert!(!Acknowledged.can_transition_to(Active));
        assert!(!Resolved.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(Active));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn new_alert_copies_rule_fields() {
        let rule = cpu_rule();
        let now = Utc::now();
        let alert = NewAlert::from_breach(&rule, "web-1", 85.0, now);

        assert_eq!(alert.rule_id, Some(7));
        assert_eq!(alert.threshold, 80.0);
        assert_eq!(alert.value, 85.0);
        assert_eq!(alert.start_time, now);
        assert_eq!(alert.message, "CPU usage warning: 85.0% (threshold > 80.0%)");
        assert!(alert.description.contains("web-1"));
    }

    #[test]
    fn resolved_event_carries_operator_note() {
        let now = Utc::now();
        let alert = Alert {
            id: 1,
            rule_id: Some(7),
            hostname: "web-1".into(),
            metric_type: MetricKind::Cpu,
            severity: Severity::Critical,
            value: 95.0,
            threshold: 90.0,
            status: AlertStatus::Acknowledged,
            message: "CPU hot".into(),
            description: String::new(),
            start_time: now,
            end_time: None,
            updated_at: now,
        };

        let created = NewSystemEvent::alert_created(&alert);
        assert_eq!(created.event_type, EVENT_ALERT_CREATED);
        assert_eq!(created.severity, "critical");

        let resolved = NewSystemEvent::alert_resolved(&alert, "fixed the cron job", now);
        assert_eq!(resolved.event_type, EVENT_ALERT_RESOLVED);
        assert_eq!(resolved.severity, "info");
        assert_eq!(resolved.message, "Alert resolved: CPU hot");
        assert_eq!(resolved.description, "fixed the cron job");
        assert_eq!(resolved.source, EVENT_SOURCE);
    }

    #[test]
    fn transitions_expect_the_statuses_that_may_precede_them() {
        let now = Utc::now();
        let ack = AlertTransition::acknowledge(3, "looking", now);
        let resolve = AlertTransition::resolve(3, "done", now);

        assert_eq!(ack.expected(), vec![AlertStatus::Active]);
        assert_eq!(
            resolve.expected(),
            vec![AlertStatus::Active, AlertStatus::Acknowledged]
        );
        assert!(!resolve.applies_to(AlertStatus::Resolved));
        assert_eq!(ack.history().action, AlertAction::Acknowledged);
        assert_eq!(resolve.history().message, "done");
    }

    #[test]
    fn resolving_sets_end_time_and_emits_an_event() {
        let start = Utc::now() - Duration::minutes(5);
        let alert = Alert {
            id: 3,
            rule_id: None,
            hostname: "db-1".into(),
            metric_type: MetricKind::Memory,
            severity: Severity::Warning,
            value: 91.0,
            threshold: 85.0,
            status: AlertStatus::Active,
            message: "Memory high".into(),
            description: String::new(),
            start_time: start,
            end_time: None,
            updated_at: start,
        };
        let now = Utc::now();

        let acked = AlertTransition::acknowledge(3, "", now).apply(&alert);
        assert_eq!(acked.status, AlertStatus::Acknowledged);
        assert_eq!(acked.end_time, None);
        assert!(AlertTransition::acknowledge(3, "", now).event(&acked).is_none());

        let resolve = AlertTransition::resolve(3, "freed cache", now);
        let resolved = resolve.apply(&acked);
        assert_eq!(resolved.end_time, Some(now));
        assert_eq!(resolved.updated_at, now);
        let event = resolve.event(&resolved).unwrap();
        assert_eq!(event.event_type, EVENT_ALERT_RESOLVED);
        assert_eq!(event.description, "freed cache");
    }

    #[test]
    fn age_is_formatted_by_magnitude() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::seconds(45), now), "45s");
        assert_eq!(format_age(now - Duration::minutes(12), now), "12m");
        assert_eq!(format_age(now - Duration::minutes(210), now), "3.5h");
        assert_eq!(format_age(now - Duration::hours(48), now), "2.0d");
        assert_eq!(format_age(now + Duration::seconds(5), now), "0s");
    }
}
