pub mod alert_rules;
pub mod alerts;
pub mod events;
pub mod monitor;
