//! `sysinfo`-backed host sampler.
//!
//! [`SystemSampler`] implements [`hostwatch_core::sampler::Sampler`] by
//! reading CPU, memory, disk and network counters from the operating system.
//! The pure pieces (virtual filesystem filtering, throughput rates) live in
//! [`filesystem`] and [`network`] so they can be tested without a host.

pub mod filesystem;
pub mod network;
mod system;

pub use system::SystemSampler;
