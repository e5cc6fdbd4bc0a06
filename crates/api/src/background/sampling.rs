//! Periodic host sampling into the in-memory history.
//!
//! This loop is the only writer of [`MetricHistory`]. It never touches the
//! alert store.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use hostwatch_core::ring_buffer::MetricHistory;
use hostwatch_core::sampler::Sampler;

use super::take_sample;

/// Run the sampling loop until `cancel` is triggered.
///
/// Each tick runs as its own task; a tick that panics is logged and the
/// loop carries on with the next one. Aborting the loop aborts the tick.
pub async fn run(
    sampler: Arc<dyn Sampler>,
    history: Arc<MetricHistory>,
    interval: Duration,
    call_timeout: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs_f64(),
        "Sampling loop started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Sampling loop stopping");
                break;
            }
            _ = ticker.tick() => {
                let tick = AbortOnDropHandle::new(tokio::spawn(sample_once(
                    Arc::clone(&sampler),
                    Arc::clone(&history),
                    call_timeout,
                )));
                if let Err(e) = tick.await {
                    tracing::error!(error = %e, "Sampling tick panicked");
                }
            }
        }
    }
}

/// Take one reading and append it to `history`.
///
/// A failed reading is logged and leaves the history unchanged. Returns
/// whether a point was recorded.
pub async fn sample_once(
    sampler: Arc<dyn Sampler>,
    history: Arc<MetricHistory>,
    call_timeout: Duration,
) -> bool {
    match take_sample(sampler, call_timeout).await {
        Ok(snapshot) => {
            history.record(&snapshot);
            tracing::debug!(
                cpu = snapshot.cpu_percent,
                memory = snapshot.memory_percent,
                network = snapshot.network_bytes_per_sec(),
                "Sample recorded"
            );
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sampling failed, skipping tick");
            false
        }
    }
}
