//! Environment prober.
//!
//! Samples memory and free disk once and reports anything below the
//! configured thresholds. Never fails the run.

use std::path::{Path, PathBuf};
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};
use tracing::{info, warn};

use crate::config::StackConfig;
use crate::domain::system::{bytes_to_gib, HostSnapshot, ResourceWarning};

use super::output::Console;

/// Source of host resource information
pub trait HostInspector: Send + Sync {
    fn snapshot(&self, base_dir: &Path) -> HostSnapshot;
}

/// Reads the live host through `sysinfo`
#[derive(Debug, Default, Clone)]
pub struct SysinfoInspector;

impl HostInspector for SysinfoInspector {
    fn snapshot(&self, base_dir: &Path) -> HostSnapshot {
        let sys = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<(PathBuf, u64)> = disks
            .iter()
            .map(|d| (d.mount_point().to_path_buf(), d.available_space()))
            .collect();

        let target = existing_ancestor(base_dir);
        let (disk_mount, available_disk_bytes) = select_disk(&target, &mounts)
            .map(|(mount, avail)| (mount.to_string_lossy().to_string(), avail))
            .unwrap_or_else(|| ("unknown".to_string(), 0));

        HostSnapshot {
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            os_name: System::long_os_version().unwrap_or_else(|| "unknown".to_string()),
            cpu_count: sys.cpus().len(),
            total_memory_bytes: sys.total_memory(),
            available_disk_bytes,
            disk_mount,
        }
    }
}

/// Nearest existing ancestor, canonicalized when possible
fn existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| p.exists())
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Disk whose mount point is the longest prefix of `target`.
/// Falls back to the disk with the most free space when nothing matches.
pub fn select_disk<'a>(target: &Path, mounts: &'a [(PathBuf, u64)]) -> Option<(&'a Path, u64)> {
    mounts
        .iter()
        .filter(|(mount, _)| target.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .or_else(|| mounts.iter().max_by_key(|(_, avail)| *avail))
        .map(|(mount, avail)| (mount.as_path(), *avail))
}

/// Probe the host and print warnings; returns the snapshot and warnings.
pub fn probe_environment(
    inspector: &dyn HostInspector,
    config: &StackConfig,
    console: &Console,
) -> (HostSnapshot, Vec<ResourceWarning>) {
    let snapshot = inspector.snapshot(&config.base_dir);

    console.info(&format!(
        "Host {} ({}, {} CPUs)",
        snapshot.hostname, snapshot.os_name, snapshot.cpu_count
    ));
    console.info(&format!(
        "Memory: {:.2} GiB total, disk: {:.2} GiB free on {}",
        bytes_to_gib(snapshot.total_memory_bytes),
        bytes_to_gib(snapshot.available_disk_bytes),
        snapshot.disk_mount
    ));

    let warnings = snapshot.warnings(&config.thresholds);
    for w in &warnings {
        warn!(warning = %w, "Host resources below recommendation");
        console.warn(&format!("{} (continuing anyway)", w));
    }

    info!(
        memory_bytes = snapshot.total_memory_bytes,
        disk_bytes = snapshot.available_disk_bytes,
        warnings = warnings.len(),
        "Environment probed"
    );

    (snapshot, warnings)
}
