use super::process::is_thread;
use super::{blocking, now_ms, MetricsProvider, ROOT_PATH};
use std::path::{Path, PathBuf};
use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, ProcessRefreshKind, RefreshKind, System,
};
use sysmon_protocol::status::{
    usage_percent, CpuSnapshot, DiskSnapshot, MemorySnapshot, NetworkInterface, NetworkSnapshot,
    SystemSummary,
};
use sysmon_protocol::ToolError;

impl MetricsProvider {
    pub async fn sample_cpu(&self) -> Result<CpuSnapshot, ToolError> {
        self.ensure_supported()?;
        let mut system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()),
        );

        // usage is the delta between two refreshes
        tokio::time::sleep(self.cpu_interval).await;
        system.refresh_cpu_usage();

        let cpus = system.cpus();
        if cpus.is_empty() {
            return Err(ToolError::unavailable("no CPU information available"));
        }

        let frequency = cpus[0].frequency();
        Ok(CpuSnapshot {
            overall_percent: clamp_percent(system.global_cpu_usage()),
            per_core: cpus.iter().map(|cpu| clamp_percent(cpu.cpu_usage())).collect(),
            core_count: cpus.len() as u32,
            brand: cpus[0].brand().trim().to_string(),
            frequency_mhz: (frequency > 0).then_some(frequency),
            timestamp_ms: now_ms(),
        })
    }

    pub async fn sample_memory(&self) -> Result<MemorySnapshot, ToolError> {
        self.ensure_supported()?;
        blocking(read_memory).await
    }

    pub async fn sample_disk(&self, path: &str) -> Result<DiskSnapshot, ToolError> {
        self.ensure_supported()?;
        let queried = path.to_string();
        blocking(move || {
            let path = Path::new(&queried);
            let usage = filesystem_usage(path)?;
            let (mount_point, file_system) = match find_mount(path) {
                Some((mount, fs)) => (Some(mount), Some(fs)),
                None => (None, None),
            };
            Ok(DiskSnapshot {
                path: queried.clone(),
                mount_point,
                file_system,
                total_bytes: usage.total,
                used_bytes: usage.used,
                free_bytes: usage.free,
                percent: usage_percent(usage.used, usage.total),
                timestamp_ms: now_ms(),
            })
        })
        .await
    }

    pub async fn sample_network(&self) -> Result<NetworkSnapshot, ToolError> {
        self.ensure_supported()?;
        blocking(read_network).await
    }

    pub async fn summary(&self) -> Result<SystemSummary, ToolError> {
        self.ensure_supported()?;
        let process_count = blocking(|| {
            let sys = System::new_with_specifics(
                RefreshKind::nothing().with_processes(ProcessRefreshKind::nothing()),
            );
            Ok(sys
                .processes()
                .values()
                .filter(|process| !is_thread(process))
                .count())
        });
        let (cpu, memory, disk, total_processes) = tokio::try_join!(
            self.sample_cpu(),
            self.sample_memory(),
            self.sample_disk(ROOT_PATH),
            process_count
        )?;

        Ok(SystemSummary {
            hostname: System::host_name(),
            os_name: System::long_os_version().or_else(System::name),
            kernel_version: System::kernel_version(),
            cpu_percent: cpu.overall_percent,
            memory_percent: memory.percent,
            memory_available_bytes: memory.available_bytes,
            disk_percent: disk.percent,
            disk_free_bytes: disk.free_bytes,
            total_processes,
            boot_time: System::boot_time(),
            uptime_seconds: System::uptime(),
            timestamp_ms: now_ms(),
        })
    }
}

fn read_memory() -> Result<MemorySnapshot, ToolError> {
    let mut sys = System::new();
    sys.refresh_memory_specifics(MemoryRefreshKind::everything());

    let total = sys.total_memory();
    if total == 0 {
        return Err(ToolError::unavailable("memory statistics could not be read"));
    }
    let used = sys.used_memory().min(total);
    let swap_total = sys.total_swap();
    let swap_used = sys.used_swap().min(swap_total);

    Ok(MemorySnapshot {
        total_bytes: total,
        used_bytes: used,
        available_bytes: sys.available_memory().min(total),
        percent: usage_percent(used, total),
        swap_total_bytes: swap_total,
        swap_used_bytes: swap_used,
        swap_percent: usage_percent(swap_used, swap_total),
        timestamp_ms: now_ms(),
    })
}

fn read_network() -> Result<NetworkSnapshot, ToolError> {
    let networks = Networks::new_with_refreshed_list();

    let mut interfaces: Vec<NetworkInterface> = networks
        .list()
        .iter()
        .map(|(name, data)| NetworkInterface {
            name: name.clone(),
            received_bytes: data.total_received(),
            transmitted_bytes: data.total_transmitted(),
            packets_received: data.total_packets_received(),
            packets_transmitted: data.total_packets_transmitted(),
            errors_in: data.total_errors_on_received(),
            errors_out: data.total_errors_on_transmitted(),
        })
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(NetworkSnapshot {
        total_received_bytes: interfaces.iter().map(|i| i.received_bytes).sum(),
        total_transmitted_bytes: interfaces.iter().map(|i| i.transmitted_bytes).sum(),
        interfaces,
        timestamp_ms: now_ms(),
    })
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

struct FsUsage {
    total: u64,
    used: u64,
    free: u64,
}

#[cfg(unix)]
fn filesystem_usage(path: &Path) -> Result<FsUsage, ToolError> {
    use nix::errno::Errno;

    let stat = nix::sys::statvfs::statvfs(path).map_err(|errno| match errno {
        Errno::ENOENT | Errno::ENOTDIR | Errno::ENAMETOOLONG | Errno::ELOOP => {
            ToolError::invalid("path", format!("`{}` does not exist", path.display()))
        }
        other => ToolError::unavailable(format!(
            "statvfs on `{}` failed: {}",
            path.display(),
            other
        )),
    })?;

    let fragment = u64::from(stat.fragment_size());
    let total = u64::from(stat.blocks()) * fragment;
    let free = u64::from(stat.blocks_available()) * fragment;
    // reserved blocks count as used, like df
    let used = total.saturating_sub(u64::from(stat.blocks_free()) * fragment);

    Ok(FsUsage { total, used, free })
}

#[cfg(not(unix))]
fn filesystem_usage(path: &Path) -> Result<FsUsage, ToolError> {
    let canonical = canonicalize(path)?;
    let disks = Disks::new_with_refreshed_list();
    let disk = longest_mount(&disks, &canonical).ok_or_else(|| {
        ToolError::invalid(
            "path",
            format!("`{}` is not on a mounted filesystem", path.display()),
        )
    })?;

    let total = disk.total_space();
    let free = disk.available_space().min(total);
    Ok(FsUsage {
        total,
        used: total - free,
        free,
    })
}

#[cfg(not(unix))]
fn canonicalize(path: &Path) -> Result<PathBuf, ToolError> {
    std::fs::canonicalize(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => {
            ToolError::invalid("path", format!("`{}` does not exist", path.display()))
        }
        _ => ToolError::unavailable(format!("cannot resolve `{}`: {}", path.display(), err)),
    })
}

/// Mount point and filesystem type of the disk holding `path`, when sysinfo
/// lists it. Containers frequently hide the root overlay, so this is optional.
fn find_mount(path: &Path) -> Option<(String, String)> {
    let canonical: PathBuf = std::fs::canonicalize(path).ok()?;
    let disks = Disks::new_with_refreshed_list();
    longest_mount(&disks, &canonical).map(|disk| {
        (
            disk.mount_point().to_string_lossy().into_owned(),
            disk.file_system().to_string_lossy().into_owned(),
        )
    })
}

fn longest_mount<'a>(disks: &'a Disks, path: &Path) -> Option<&'a sysinfo::Disk> {
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().components().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysmon_protocol::ToolErrorKind;

    const TOLERANCE: f64 = 1e-6;

    #[tokio::test]
    async fn test_sample_cpu() {
        let cpu = MetricsProvider::new().sample_cpu().await.unwrap();
        assert!(cpu.core_count > 0);
        assert!((0.0..=100.0).contains(&cpu.overall_percent));
        assert_eq!(cpu.per_core.len(), cpu.core_count as usize);
        assert!(cpu.per_core.iter().all(|p| (0.0..=100.0).contains(p)));
    }

    #[tokio::test]
    async fn test_sample_memory() {
        let mem = MetricsProvider::new().sample_memory().await.unwrap();
        assert!(mem.total_bytes > 0);
        assert!(mem.used_bytes <= mem.total_bytes);
        assert!(mem.available_bytes <= mem.total_bytes);
        let expected = mem.used_bytes as f64 / mem.total_bytes as f64 * 100.0;
        assert!((mem.percent - expected).abs() < TOLERANCE);
        assert!(mem.swap_used_bytes <= mem.swap_total_bytes);
    }

    #[tokio::test]
    async fn test_sample_root_disk() {
        let disk = MetricsProvider::new().sample_disk(ROOT_PATH).await.unwrap();
        assert_eq!(disk.path, ROOT_PATH);
        assert!(disk.total_bytes > 0);
        assert!(disk.used_bytes <= disk.total_bytes);
        assert!(disk.free_bytes <= disk.total_bytes);
        let expected = disk.used_bytes as f64 / disk.total_bytes as f64 * 100.0;
        assert!((disk.percent - expected).abs() < TOLERANCE);
    }

    #[tokio::test]
    async fn test_sample_missing_disk_path() {
        let err = MetricsProvider::new()
            .sample_disk("/definitely/not/a/real/path")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_sample_network_totals() {
        let net = MetricsProvider::new().sample_network().await.unwrap();
        let received: u64 = net.interfaces.iter().map(|i| i.received_bytes).sum();
        assert_eq!(net.total_received_bytes, received);
        assert!(net.interfaces.windows(2).all(|w| w[0].name <= w[1].name));
    }

    #[tokio::test]
    async fn test_summary() {
        let summary = MetricsProvider::new().summary().await.unwrap();
        assert!((0.0..=100.0).contains(&summary.cpu_percent));
        assert!((0.0..=100.0).contains(&summary.memory_percent));
        assert!((0.0..=100.0).contains(&summary.disk_percent));
        assert!(summary.total_processes > 0);
    }

    #[test]
    fn clamp_percent_rejects_nan() {
        assert_eq!(clamp_percent(f32::NAN), 0.0);
        assert_eq!(clamp_percent(130.0), 100.0);
        assert_eq!(clamp_percent(-1.0), 0.0);
    }
}
