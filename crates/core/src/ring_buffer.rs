//! Bounded, thread-safe sample history.
//!
//! [`RingBuffer`] keeps the most recent `capacity` points of one metric.
//! [`MetricHistory`] bundles one buffer per charted metric kind and is the
//! single state object shared between the sampling loop (sole writer) and
//! the HTTP layer (readers).

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use crate::metric::{HistoryPoint, MetricKind, MetricSnapshot};
use crate::types::Timestamp;

/// Number of points retained per metric.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity FIFO that evicts the oldest point when full.
///
/// `push` takes the write lock and `snapshot` the read lock, so concurrent
/// snapshots never block each other and always observe a whole push.
#[derive(Debug)]
pub struct RingBuffer {
    capacity: usize,
    points: RwLock<VecDeque<HistoryPoint>>,
}

impl RingBuffer {
    /// Create an empty buffer. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a point, evicting the oldest one first if the buffer is full.
    pub fn push(&self, value: f64, timestamp: Timestamp) {
        let mut points = self.points.write().unwrap_or_else(PoisonError::into_inner);
        if points.len() == self.capacity {
            points.pop_front();
        }
        points.push_back(HistoryPoint { timestamp, value });
    }

    /// Copy of the buffered points, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryPoint> {
        let points = self.points.read().unwrap_or_else(PoisonError::into_inner);
        points.iter().copied().collect()
    }

    /// Most recently pushed point.
    pub fn latest(&self) -> Option<HistoryPoint> {
        let points = self.points.read().unwrap_or_else(PoisonError::into_inner);
        points.back().copied()
    }

    pub fn len(&self) -> usize {
        self.points
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// MetricHistory
// ---------------------------------------------------------------------------

/// Rolling history for cpu, memory and network, plus the last full snapshot.
#[derive(Debug)]
pub struct MetricHistory {
    cpu: RingBuffer,
    memory: RingBuffer,
    network: RingBuffer,
    latest: RwLock<Option<MetricSnapshot>>,
}

impl MetricHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            cpu: RingBuffer::new(capacity),
            memory: RingBuffer::new(capacity),
            network: RingBuffer::new(capacity),
            latest: RwLock::new(None),
        }
    }

    /// Push one point per charted metric from a successful sample.
    pub fn record(&self, snapshot: &MetricSnapshot) {
        let at = snapshot.timestamp;
        self.cpu.push(snapshot.cpu_percent, at);
        self.memory.push(snapshot.memory_percent, at);
        self.network.push(snapshot.network_bytes_per_sec(), at);
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
    }

    /// The buffer backing `kind`. Disk usage is not charted, so it has none.
    pub fn buffer(&self, kind: MetricKind) -> Option<&RingBuffer> {
        match kind {
            MetricKind::Cpu => Some(&self.cpu),
            MetricKind::Memory => Some(&self.memory),
            MetricKind::Network => Some(&self.network),
            MetricKind::Disk => None,
        }
    }

    /// Copy of the history for `kind` (empty for kinds without a buffer).
    pub fn snapshot(&self, kind: MetricKind) -> Vec<HistoryPoint> {
        self.buffer(kind)
            .map(RingBuffer::snapshot)
            .unwrap_or_default()
    }

    /// The snapshot most recently passed to [`record`](Self::record).
    pub fn latest(&self) -> Option<MetricSnapshot> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MetricHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
