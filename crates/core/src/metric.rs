//! Metric kinds, host snapshots, and history points.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// MetricKind
// ---------------------------------------------------------------------------

/// The resource a rule or alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Disk,
        MetricKind::Network,
    ];

    /// Canonical lowercase name, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
            MetricKind::Network => "network",
        }
    }

    /// Human-readable label used in alert messages.
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU usage",
            MetricKind::Memory => "Memory usage",
            MetricKind::Disk => "Disk usage",
            MetricKind::Network => "Network throughput",
        }
    }

    /// Unit suffix used when formatting values of this kind.
    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::Network => " B/s",
            _ => "%",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(MetricKind::Cpu),
            "memory" => Ok(MetricKind::Memory),
            "disk" => Ok(MetricKind::Disk),
            "network" => Ok(MetricKind::Network),
            other => Err(CoreError::Validation(format!(
                "unknown metric type '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Usage of a single mounted, non-virtual partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskPartition {
    pub device: String,
    pub mount_point: String,
    pub filesystem: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
}

/// An instantaneous read of host resource usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub hostname: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    /// Mean of `partitions[..].usage_percent`, or 0 when there are none.
    pub disk_percent: f64,
    pub partitions: Vec<DiskPartition>,
    pub network_sent_per_sec: f64,
    pub network_recv_per_sec: f64,
    pub timestamp: Timestamp,
}

impl MetricSnapshot {
    /// The value rules for `kind` are compared against.
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cpu => self.cpu_percent,
            MetricKind::Memory => self.memory_percent,
            MetricKind::Disk => self.disk_percent,
            MetricKind::Network => self.network_bytes_per_sec(),
        }
    }

    /// Combined sent + received throughput.
    pub fn network_bytes_per_sec(&self) -> f64 {
        self.network_sent_per_sec + self.network_recv_per_sec
    }
}

/// Average usage across partitions; an empty slice yields 0.
pub fn mean_usage(partitions: &[DiskPartition]) -> f64 {
    if partitions.is_empty() {
        return 0.0;
    }
    partitions.iter().map(|p| p.usage_percent).sum::<f64>() / partitions.len() as f64
}

/// One entry of a metric's rolling history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
