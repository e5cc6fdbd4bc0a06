//! Periodic alert rule evaluation.
//!
//! Takes a fresh reading from the sampler on every tick (independent of the
//! history buffers) and hands it to the [`AlertManager`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use hostwatch_core::alerting::{AlertManager, EvaluationSummary};
use hostwatch_core::sampler::Sampler;

use super::{take_sample, ALERT_CHECK_INTERVAL_KEY, DEFAULT_EVALUATION_INTERVAL};

/// Run the evaluation loop until `cancel` is triggered.
///
/// With `interval` unset the cadence is read once from the store at start;
/// cancelling during that read stops the loop before its first tick. The
/// first evaluation happens immediately. Each tick runs as its own task and
/// is aborted if the loop itself is.
pub async fn run(
    alerts: Arc<AlertManager>,
    sampler: Arc<dyn Sampler>,
    interval: Option<Duration>,
    call_timeout: Duration,
    cancel: CancellationToken,
) {
    let interval = match interval {
        Some(interval) => interval,
        None => tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Alert evaluation loop cancelled before its first tick");
                return;
            }
            interval = configured_interval(&alerts) => interval,
        },
    };

    tracing::info!(
        interval_secs = interval.as_secs_f64(),
        "Alert evaluation loop started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Alert evaluation loop stopping");
                break;
            }
            _ = ticker.tick() => {
                let tick = AbortOnDropHandle::new(tokio::spawn(evaluate_once(
                    Arc::clone(&alerts),
                    Arc::clone(&sampler),
                    call_timeout,
                )));
                if let Err(e) = tick.await {
                    tracing::error!(error = %e, "Alert evaluation tick panicked");
                }
            }
        }
    }
}

/// Sample the host and evaluate its rules once.
///
/// Returns `None` when either step failed; the failure is logged and the
/// next tick retries.
pub async fn evaluate_once(
    alerts: Arc<AlertManager>,
    sampler: Arc<dyn Sampler>,
    call_timeout: Duration,
) -> Option<EvaluationSummary> {
    let snapshot = match take_sample(sampler, call_timeout).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Alert evaluation skipped: no host reading");
            return None;
        }
    };

    match alerts.evaluate(&snapshot).await {
        Ok(summary) => {
            if summary.opened > 0 || summary.failed > 0 {
                tracing::info!(
                    hostname = %snapshot.hostname,
                    rules_checked = summary.rules_checked,
                    opened = summary.opened,
                    refreshed = summary.refreshed,
                    failed = summary.failed,
                    "Alert evaluation finished"
                );
            } else {
                tracing::debug!(
                    rules_checked = summary.rules_checked,
                    refreshed = summary.refreshed,
                    "Alert evaluation finished"
                );
            }
            Some(summary)
        }
        Err(e) => {
            tracing::error!(error = %e, "Alert evaluation failed");
            None
        }
    }
}

/// Evaluation cadence from the `alert_check_interval` config key.
///
/// Missing, unreadable, non-numeric or zero values fall back to
/// [`DEFAULT_EVALUATION_INTERVAL`].
pub async fn configured_interval(alerts: &AlertManager) -> Duration {
    let raw = match alerts.config_value(ALERT_CHECK_INTERVAL_KEY).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read alert check interval, using default");
            None
        }
    };

    match raw.as_deref().map(str::trim).map(str::parse::<u64>) {
        Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
        Some(_) => {
            tracing::warn!(value = ?raw, "Invalid alert check interval, using default");
            DEFAULT_EVALUATION_INTERVAL
        }
        None => DEFAULT_EVALUATION_INTERVAL,
    }
}
