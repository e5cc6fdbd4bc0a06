//! Row structs for the monitoring tables.
//!
//! Each row derives `FromRow` and converts into its `hostwatch-core` domain
//! type with `TryFrom`, parsing the TEXT enum columns on the way.

pub mod alert;
pub mod alert_history;
pub mod alert_rule;
pub mod system_event;
