//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod alert_history_repo;
pub mod alert_repo;
pub mod alert_rule_repo;
pub mod config_repo;
pub mod system_event_repo;

pub use alert_history_repo::AlertHistoryRepo;
pub use alert_repo::AlertRepo;
pub use alert_rule_repo::AlertRuleRepo;
pub use config_repo::ConfigRepo;
pub use system_event_repo::SystemEventRepo;
