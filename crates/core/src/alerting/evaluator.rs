//! Rule evaluation.
//!
//! Pure logic, no storage access. The caller fetches rules and the active
//! alert for each key and applies the returned decisions.

use std::collections::HashSet;

use crate::alert::Alert;
use crate::metric::{MetricKind, MetricSnapshot};
use crate::rule::{AlertRule, Severity};

/// Outcome of comparing one rule against the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleCheck<'a> {
    pub rule: &'a AlertRule,
    pub value: f64,
    pub breached: bool,
}

/// What should happen to the alert for a rule's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Breach with no active alert: open a new one.
    Open,
    /// An active alert exists: refresh its value, whatever the breach state.
    Refresh,
    /// No breach, no active alert.
    Nothing,
}

/// Rules that take part in an evaluation for `hostname`.
///
/// Keeps enabled rules that are global or scoped to `hostname`, orders
/// host-scoped rules ahead of global ones (stable otherwise), and keeps only
/// the first rule for each `(metric_type, severity)` pair.
pub fn select_rules<'a>(rules: &'a [AlertRule], hostname: &str) -> Vec<&'a AlertRule> {
    let mut candidates: Vec<&AlertRule> = rules
        .iter()
        .filter(|r| r.enabled && r.applies_to(hostname))
        .collect();
    candidates.sort_by_key(|r| r.hostname.is_none());

    let mut seen: HashSet<(MetricKind, Severity)> = HashSet::new();
    candidates
        .into_iter()
        .filter(|r| seen.insert((r.metric_type, r.severity)))
        .collect()
}

/// Compare every selected rule against `snapshot`.
pub fn check_rules<'a>(snapshot: &MetricSnapshot, rules: &'a [AlertRule]) -> Vec<RuleCheck<'a>> {
    select_rules(rules, &snapshot.hostname)
        .into_iter()
        .map(|rule| {
            let value = snapshot.value(rule.metric_type);
            RuleCheck {
                rule,
                value,
                breached: rule.is_breached(value),
            }
        })
        .collect()
}

/// Decide the lifecycle step for a key. Alerts never auto-resolve.
pub fn transition(breached: bool, active: Option<&Alert>) -> Transition {
    match (breached, active) {
        (_, Some(_)) => Transition::Refresh,
        (true, None) => Transition::Open,
        (false, None) => Transition::Nothing,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
