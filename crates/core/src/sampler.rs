//! The host sampling contract.

use crate::metric::MetricSnapshot;

/// Why a sample could not be taken.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollectionError {
    #[error("the operating system reported no CPUs")]
    NoCpus,

    #[error("the operating system reported zero total memory")]
    NoMemory,

    #[error("host metrics unavailable: {0}")]
    Unavailable(String),
}

/// Reads current resource usage from the host.
///
/// Implementations block on OS calls; async callers run them through
/// `tokio::task::spawn_blocking`.
pub trait Sampler: Send + Sync + 'static {
    fn sample(&self) -> Result<MetricSnapshot, CollectionError>;
}
