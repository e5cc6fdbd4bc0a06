//! Domain logic for hostwatch.
//!
//! Everything in this crate is independent of the operating system and of
//! the storage backend:
//!
//! - [`metric`] and [`ring_buffer`]: snapshots and bounded sample history.
//! - [`rule`] and [`alert`]: alert rules, alerts, history and event records.
//! - [`alerting`]: the rule evaluator and the alert lifecycle manager.
//! - [`store`]: the storage trait the lifecycle manager writes through, plus
//!   an in-memory implementation.
//! - [`sampler`]: the trait host samplers implement.

pub mod alert;
pub mod alerting;
pub mod error;
pub mod metric;
pub mod ring_buffer;
pub mod rule;
pub mod sampler;
pub mod store;
pub mod types;
