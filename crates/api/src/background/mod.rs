//! Background tasks and scheduled jobs.
//!
//! [`Scheduler`] drives two independent loops: [`sampling`] feeds the
//! in-memory history on a fast cadence and [`alert_evaluation`] checks the
//! alert rules on a slower one. Both stop when the shared
//! [`CancellationToken`] is cancelled.

pub mod alert_evaluation;
pub mod sampling;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use hostwatch_core::alerting::{AlertManager, DEFAULT_CALL_TIMEOUT};
use hostwatch_core::metric::MetricSnapshot;
use hostwatch_core::ring_buffer::MetricHistory;
use hostwatch_core::sampler::{CollectionError, Sampler};

/// How often the sampling loop reads the host.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Evaluation cadence when `alert_check_interval` is missing or invalid.
pub const DEFAULT_EVALUATION_INTERVAL: Duration = Duration::from_secs(30);

/// Config key holding the evaluation interval in seconds.
pub const ALERT_CHECK_INTERVAL_KEY: &str = "alert_check_interval";

/// Why a host reading could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("host sampling timed out after {0:?}")]
    Timeout(Duration),

    #[error("host sampling task failed: {0}")]
    Task(String),
}

/// Take one reading on the blocking pool, bounded by `timeout`.
///
/// A sampler that panics surfaces as [`SampleError::Task`].
pub async fn take_sample(
    sampler: Arc<dyn Sampler>,
    timeout: Duration,
) -> Result<MetricSnapshot, SampleError> {
    let task = tokio::task::spawn_blocking(move || sampler.sample());
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(join_err)) => Err(SampleError::Task(join_err.to_string())),
        Err(_) => Err(SampleError::Timeout(timeout)),
    }
}

/// Owns the configuration of both background loops until [`start`](Self::start).
pub struct Scheduler {
    alerts: Arc<AlertManager>,
    history: Arc<MetricHistory>,
    sampler: Arc<dyn Sampler>,
    sample_interval: Duration,
    evaluation_interval: Option<Duration>,
    call_timeout: Duration,
}

impl Scheduler {
    pub fn new(
        alerts: Arc<AlertManager>,
        history: Arc<MetricHistory>,
        sampler: Arc<dyn Sampler>,
    ) -> Self {
        Self {
            alerts,
            history,
            sampler,
            sample_interval: SAMPLE_INTERVAL,
            evaluation_interval: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Use a fixed evaluation interval instead of reading
    /// [`ALERT_CHECK_INTERVAL_KEY`] from the store.
    pub fn with_evaluation_interval(mut self, interval: Duration) -> Self {
        self.evaluation_interval = Some(interval);
        self
    }

    /// Bound applied to each host reading.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Spawn both loops. They run until `cancel` is triggered.
    pub fn start(self, cancel: CancellationToken) -> SchedulerHandle {
        let sampling = tokio::spawn(sampling::run(
            Arc::clone(&self.sampler),
            Arc::clone(&self.history),
            self.sample_interval,
            self.call_timeout,
            cancel.clone(),
        ));

        let evaluation = tokio::spawn(alert_evaluation::run(
            Arc::clone(&self.alerts),
            Arc::clone(&self.sampler),
            self.evaluation_interval,
            self.call_timeout,
            cancel.clone(),
        ));

        SchedulerHandle {
            cancel,
            grace: self.sample_interval,
            sampling,
            evaluation,
        }
    }
}

/// Running loops returned by [`Scheduler::start`].
pub struct SchedulerHandle {
    cancel: CancellationToken,
    grace: Duration,
    sampling: JoinHandle<()>,
    evaluation: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Cancel both loops and wait for them, for at most one sampling interval.
    ///
    /// Loops still running when the wait gives up are aborted along with
    /// their in-flight ticks, and `false` is returned.
    pub async fn shutdown(mut self) -> bool {
        self.cancel.cancel();

        let finished = tokio::time::timeout(
            self.grace,
            futures::future::join(&mut self.sampling, &mut self.evaluation),
        )
        .await;
        match finished {
            Ok((sampling, evaluation)) => {
                for (name, result) in [("sampling", sampling), ("evaluation", evaluation)] {
                    if let Err(e) = result {
                        tracing::error!(task = name, error = %e, "Background loop ended abnormally");
                    }
                }
                tracing::info!("Scheduler stopped");
                true
            }
            Err(_) => {
                tracing::warn!(
                    grace_secs = self.grace.as_secs_f64(),
                    "Scheduler did not stop in time, aborting in-flight ticks"
                );
                self.sampling.abort();
                self.evaluation.abort();
                false
            }
        }
    }
}
