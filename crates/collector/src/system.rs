//! [`SystemSampler`]: the production [`Sampler`].

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use chrono::Utc;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use hostwatch_core::metric::{mean_usage, DiskPartition, MetricSnapshot};
use hostwatch_core::sampler::{CollectionError, Sampler};
use hostwatch_core::types::FALLBACK_HOSTNAME;

use crate::filesystem;
use crate::network::{self, RateTracker};

/// OS handles reused between samples so CPU usage and network rates are
/// computed against the previous refresh.
struct SamplerState {
    system: System,
    disks: Disks,
    networks: Networks,
    rates: RateTracker,
}

/// Samples the local host through `sysinfo`.
///
/// Blocking: the refresh calls read `/proc` (or the platform equivalent).
/// Run [`Sampler::sample`] through `spawn_blocking` from async code.
pub struct SystemSampler {
    hostname: String,
    state: Mutex<SamplerState>,
}

impl SystemSampler {
    /// Create a sampler, resolving the hostname once.
    ///
    /// `hostname_override` wins over the OS hostname; if neither is
    /// available the sampler reports [`FALLBACK_HOSTNAME`].
    pub fn new(hostname_override: Option<String>) -> Self {
        let hostname = hostname_override
            .filter(|h| !h.trim().is_empty())
            .or_else(System::host_name)
            .unwrap_or_else(|| {
                tracing::warn!("Hostname unavailable, reporting as {FALLBACK_HOSTNAME}");
                FALLBACK_HOSTNAME.to_string()
            });

        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );

        tracing::info!(%hostname, cpus = system.cpus().len(), "System sampler initialised");

        Self {
            hostname,
            state: Mutex::new(SamplerState {
                system,
                disks: Disks::new_with_refreshed_list(),
                networks: Networks::new_with_refreshed_list(),
                rates: RateTracker::new(),
            }),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl Sampler for SystemSampler {
    fn sample(&self) -> Result<MetricSnapshot, CollectionError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let SamplerState {
            system,
            disks,
            networks,
            rates,
        } = &mut *state;

        system.refresh_cpu_usage();
        system.refresh_memory();
        if system.cpus().is_empty() {
            return Err(CollectionError::NoCpus);
        }
        let memory_total_bytes = system.total_memory();
        if memory_total_bytes == 0 {
            return Err(CollectionError::NoMemory);
        }
        let memory_used_bytes = system.used_memory();

        // Mounts come and go (USB drives, network shares).
        disks.refresh_list();
        let partitions: Vec<DiskPartition> = disks
            .list()
            .iter()
            .filter_map(|disk| {
                filesystem::partition(
                    &disk.name().to_string_lossy(),
                    &disk.mount_point().to_string_lossy(),
                    &disk.file_system().to_string_lossy(),
                    disk.total_space(),
                    disk.available_space(),
                )
            })
            .collect();

        networks.refresh_list();
        let (sent_total, recv_total) = networks
            .list()
            .iter()
            .filter(|(name, _)| !network::is_loopback(name))
            .fold((0u64, 0u64), |(sent, recv), (_, data)| {
                (
                    sent.saturating_add(data.total_transmitted()),
                    recv.saturating_add(data.total_received()),
                )
            });
        let throughput = rates.update(sent_total, recv_total, Instant::now());

        Ok(MetricSnapshot {
            hostname: self.hostname.clone(),
            cpu_percent: f64::from(system.global_cpu_usage()).clamp(0.0, 100.0),
            memory_percent: memory_used_bytes as f64 / memory_total_bytes as f64 * 100.0,
            memory_total_bytes,
            memory_used_bytes,
            disk_percent: mean_usage(&partitions),
            partitions,
            network_sent_per_sec: throughput.sent_per_sec,
            network_recv_per_sec: throughput.recv_per_sec,
            timestamp: Utc::now(),
        })
    }
}
