//! Network throughput from cumulative interface counters.

use std::time::Instant;

/// Interfaces whose traffic never leaves the host.
pub fn is_loopback(interface: &str) -> bool {
    interface == "lo" || interface.starts_with("lo0") || interface.eq_ignore_ascii_case("loopback")
}

/// Bytes per second, sent and received.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Throughput {
    pub sent_per_sec: f64,
    pub recv_per_sec: f64,
}

#[derive(Debug, Clone, Copy)]
struct Reading {
    at: Instant,
    sent: u64,
    recv: u64,
}

/// Turns successive cumulative byte totals into per-second rates.
///
/// The first reading has nothing to compare against and reports zero.
/// Counter resets (totals going backwards) also report zero for that step.
#[derive(Debug, Default)]
pub struct RateTracker {
    last: Option<Reading>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, sent_total: u64, recv_total: u64, at: Instant) -> Throughput {
        let current = Reading {
            at,
            sent: sent_total,
            recv: recv_total,
        };
        let previous = self.last.replace(current);

        let Some(prev) = previous else {
            return Throughput::default();
        };
        let elapsed = at.saturating_duration_since(prev.at).as_secs_f64();
        if elapsed <= 0.0 {
            return Throughput::default();
        }

        Throughput {
            sent_per_sec: sent_total.saturating_sub(prev.sent) as f64 / elapsed,
            recv_per_sec: recv_total.saturating_sub(prev.recv) as f64 / elapsed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
