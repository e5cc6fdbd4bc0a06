//! Partition filtering and usage math.
//!
//! Only real, mounted storage counts toward disk usage: pseudo filesystems
//! (tmpfs, proc, overlay, ...) and host-integration mounts (WSL, `/run`,
//! `/proc`, ...) are skipped before averaging.

use hostwatch_core::metric::DiskPartition;

/// Filesystem types that never represent persistent storage.
pub const VIRTUAL_FILESYSTEMS: &[&str] = &[
    "tmpfs", "devtmpfs", "sysfs", "proc", "squashfs", "overlay", "none", "rootfs", "9p", "devfs",
    "autofs", "cgroup", "cgroup2",
];

/// Mount point prefixes that are excluded regardless of filesystem type.
pub const EXCLUDED_MOUNT_PREFIXES: &[&str] = &[
    "/mnt/wsl",
    "/mnt/wslg",
    "/usr/lib/wsl",
    "/usr/lib/modules",
    "/run",
    "/init",
    "/proc",
    "/sys",
    "/dev",
];

/// Whether a mount should be left out of disk aggregation.
pub fn is_excluded(filesystem: &str, mount_point: &str) -> bool {
    if VIRTUAL_FILESYSTEMS
        .iter()
        .any(|fs| fs.eq_ignore_ascii_case(filesystem))
    {
        return true;
    }
    EXCLUDED_MOUNT_PREFIXES
        .iter()
        .any(|prefix| is_under(mount_point, prefix))
}

/// `path` equals `prefix` or lies beneath it (`/runner` is not under `/run`).
fn is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Build a partition entry, or `None` for excluded or zero-sized mounts.
pub fn partition(
    device: &str,
    mount_point: &str,
    filesystem: &str,
    total_bytes: u64,
    available_bytes: u64,
) -> Option<DiskPartition> {
    if total_bytes == 0 || is_excluded(filesystem, mount_point) {
        return None;
    }
    let used_bytes = total_bytes.saturating_sub(available_bytes);
    Some(DiskPartition {
        device: device.to_string(),
        mount_point: mount_point.to_string(),
        filesystem: filesystem.to_string(),
        total_bytes,
        used_bytes,
        usage_percent: used_bytes as f64 / total_bytes as f64 * 100.0,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
