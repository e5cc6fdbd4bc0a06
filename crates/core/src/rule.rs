//! Alert rule definitions, comparison operators, and the default rule set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::metric::MetricKind;
use crate::types::{DbId, Timestamp};

/// Tolerance used by [`Operator::Eq`].
const EQ_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// Comparison applied as `current_value <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Eq => "==",
        }
    }

    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Lt => value < threshold,
            Operator::Gte => value >= threshold,
            Operator::Lte => value <= threshold,
            Operator::Eq => (value - threshold).abs() < EQ_EPSILON,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Gte),
            "<=" => Ok(Operator::Lte),
            "==" => Ok(Operator::Eq),
            other => Err(CoreError::Validation(format!(
                "unknown operator '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(CoreError::Validation(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertRule
// ---------------------------------------------------------------------------

/// A persisted threshold rule.
///
/// `hostname == None` means the rule applies to every host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRule {
    pub id: DbId,
    pub name: String,
    pub metric_type: MetricKind,
    pub operator: Operator,
    pub threshold: f64,
    /// Advisory only; breaches are evaluated per tick.
    pub duration_secs: i32,
    pub severity: Severity,
    pub enabled: bool,
    pub hostname: Option<String>,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AlertRule {
    /// Whether this rule covers `hostname` (global rules cover every host).
    pub fn applies_to(&self, hostname: &str) -> bool {
        self.hostname.as_deref().map_or(true, |h| h == hostname)
    }

    pub fn is_breached(&self, value: f64) -> bool {
        self.operator.compare(value, self.threshold)
    }
}

/// A validated rule ready to be inserted by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlertRule {
    pub name: String,
    pub metric_type: MetricKind,
    pub operator: Operator,
    pub threshold: f64,
    pub duration_secs: i32,
    pub severity: Severity,
    pub enabled: bool,
    pub hostname: Option<String>,
    pub description: String,
}

/// Request body for creating a rule.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAlertRule {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(required)]
    pub metric_type: Option<MetricKind>,
    #[validate(required)]
    pub operator: Option<Operator>,
    #[validate(required)]
    pub threshold: Option<f64>,
    #[validate(range(min = 0, max = 86_400))]
    #[serde(default)]
    pub duration_secs: i32,
    #[validate(required)]
    pub severity: Option<Severity>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub hostname: Option<String>,
    #[serde(default)]
    pub description: String,
}

fn default_enabled() -> bool {
    true
}

impl CreateAlertRule {
    /// Validate the request and convert it into an insertable rule.
    pub fn into_new_rule(self) -> Result<NewAlertRule, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let (Some(metric_type), Some(operator), Some(threshold), Some(severity)) =
            (self.metric_type, self.operator, self.threshold, self.severity)
        else {
            return Err(CoreError::Validation(
                "metric_type, operator, threshold and severity are required".into(),
            ));
        };
        validate_threshold(threshold)?;
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("name must not be blank".into()));
        }

        let hostname = self
            .hostname
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        Ok(NewAlertRule {
            name: self.name.trim().to_string(),
            metric_type,
            operator,
            threshold,
            duration_secs: self.duration_secs,
            severity,
            enabled: self.enabled,
            hostname,
            description: self.description,
        })
    }
}

/// Thresholds must be finite numbers.
pub fn validate_threshold(threshold: f64) -> Result<(), CoreError> {
    if !threshold.is_finite() {
        return Err(CoreError::Validation(format!(
            "threshold must be a finite number, got {threshold}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Global rules inserted when a fresh store has none.
pub fn default_rules() -> Vec<NewAlertRule> {
    const SEED: [(MetricKind, &str, f64, f64); 3] = [
        (MetricKind::Cpu, "CPU", 80.0, 90.0),
        (MetricKind::Memory, "Memory", 85.0, 95.0),
        (MetricKind::Disk, "Disk", 85.0, 95.0),
    ];

    SEED.iter()
        .flat_map(|&(metric, label, warning, critical)| {
            [
                (Severity::Warning, warning),
                (Severity::Critical, critical),
            ]
            .into_iter()
            .map(move |(severity, threshold)| NewAlertRule {
                name: format!("{label} usage {severity}"),
                metric_type: metric,
                operator: Operator::Gte,
                threshold,
                duration_secs: 0,
                severity,
                enabled: true,
                hostname: None,
                description: format!("{label} usage at or above {threshold}%"),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
