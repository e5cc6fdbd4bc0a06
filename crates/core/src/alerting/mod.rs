//! Threshold alerting.
//!
//! [`evaluator`] holds the pure rule-selection and transition logic;
//! [`manager`] applies it against an [`AlertStore`](crate::store::AlertStore)
//! and owns the operator-facing lifecycle (acknowledge, resolve, rule
//! management).

pub mod evaluator;
pub mod manager;

pub use manager::{AlertManager, EvaluationSummary, DEFAULT_CALL_TIMEOUT};
