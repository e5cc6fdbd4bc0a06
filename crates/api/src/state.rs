use std::sync::Arc;

use hostwatch_core::alerting::AlertManager;
use hostwatch_core::ring_buffer::MetricHistory;
use hostwatch_core::sampler::Sampler;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Alert lifecycle manager; owns all alert, rule and event writes.
    pub alerts: Arc<AlertManager>,
    /// Recent samples, written by the sampling loop only.
    pub history: Arc<MetricHistory>,
    /// Host sampler used for on-demand readings.
    pub sampler: Arc<dyn Sampler>,
    pub config: Arc<ServerConfig>,
}
