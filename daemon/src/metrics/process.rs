use super::{blocking, now_ms, MetricsProvider};
use sysinfo::{
    MemoryRefreshKind, Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind,
    Users,
};
use sysmon_protocol::status::{ProcessDetail, ProcessRecord, SortKey};
use sysmon_protocol::ToolError;

const CMDLINE_ARGS: usize = 3;

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing()
        .with_cpu()
        .with_memory()
        .with_user(UpdateKind::OnlyIfNotSet)
}

fn new_system() -> System {
    let mut sys = System::new();
    sys.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
    sys
}

impl MetricsProvider {
    /// Best-effort enumeration of every process visible to this user.
    ///
    /// Per-process CPU usage needs two reads, so the table is read twice
    /// `process_interval` apart. Processes that exit in between are dropped
    /// by the second refresh and never reported as errors.
    pub async fn list_processes(&self) -> Result<Vec<ProcessRecord>, ToolError> {
        self.ensure_supported()?;
        let sys = blocking(|| {
            let mut sys = new_system();
            sys.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
            Ok(sys)
        })
        .await?;

        tokio::time::sleep(self.process_interval).await;

        blocking(move || {
            let mut sys = sys;
            sys.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
            let users = Users::new_with_refreshed_list();
            let total_memory = sys.total_memory();

            let records: Vec<ProcessRecord> = sys
                .processes()
                .iter()
                .filter(|(_, process)| !is_thread(process))
                .map(|(pid, process)| to_record(*pid, process, total_memory, &users))
                .collect();
            if records.is_empty() {
                return Err(ToolError::unavailable("process table is not readable"));
            }
            Ok(records)
        })
        .await
    }

    pub async fn process_detail(&self, pid: u32) -> Result<ProcessDetail, ToolError> {
        self.ensure_supported()?;
        let target = Pid::from_u32(pid);
        let kind = refresh_kind().with_cmd(UpdateKind::OnlyIfNotSet);

        let sys = blocking(move || {
            let mut sys = new_system();
            sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[target]), true, kind);
            Ok(sys)
        })
        .await?;

        tokio::time::sleep(self.process_interval).await;

        blocking(move || {
            let mut sys = sys;
            sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[target]), true, kind);
            let process = sys
                .process(target)
                .filter(|process| !is_thread(process))
                .ok_or_else(|| ToolError::invalid("pid", format!("no process with pid {}", pid)))?;
            let users = Users::new_with_refreshed_list();

            let cmdline = process
                .cmd()
                .iter()
                .take(CMDLINE_ARGS)
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");

            Ok(ProcessDetail {
                record: to_record(target, process, sys.total_memory(), &users),
                status: process.status().to_string(),
                parent_pid: process.parent().map(|p| p.as_u32()),
                start_time: process.start_time(),
                cmdline,
                timestamp_ms: now_ms(),
            })
        })
        .await
    }

    /// Case-insensitive substring match on the process name, ascending PID.
    pub async fn search_processes(&self, needle: &str) -> Result<Vec<ProcessRecord>, ToolError> {
        let needle = needle.to_lowercase();
        let mut matches: Vec<ProcessRecord> = self
            .list_processes()
            .await?
            .into_iter()
            .filter(|record| record.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by_key(|record| record.pid);
        Ok(matches)
    }
}

/// Linux lists every task of a process next to it in the table.
pub(super) fn is_thread(process: &Process) -> bool {
    process.thread_kind().is_some()
}

fn to_record(pid: Pid, process: &Process, total_memory: u64, users: &Users) -> ProcessRecord {
    let cpu = process.cpu_usage();
    let memory = process.memory();
    let memory_percent = if total_memory == 0 {
        0.0
    } else {
        (memory as f64 / total_memory as f64 * 100.0).clamp(0.0, 100.0) as f32
    };

    ProcessRecord {
        pid: pid.as_u32(),
        name: process.name().to_string_lossy().into_owned(),
        cpu_percent: if cpu.is_finite() { cpu.max(0.0) } else { 0.0 },
        memory_percent,
        memory_bytes: memory,
        user: process
            .user_id()
            .and_then(|uid| users.get_user_by_id(uid))
            .map(|user| user.name().to_string()),
    }
}

/// Orders descending by `sort_by`, ties by ascending pid, and keeps the first
/// `limit` records.
pub fn rank_processes(
    mut records: Vec<ProcessRecord>,
    sort_by: SortKey,
    limit: usize,
) -> Vec<ProcessRecord> {
    let metric = |record: &ProcessRecord| match sort_by {
        SortKey::Cpu => record.cpu_percent,
        SortKey::Memory => record.memory_percent,
    };
    records.sort_by(|a, b| {
        metric(b)
            .total_cmp(&metric(a))
            .then_with(|| a.pid.cmp(&b.pid))
    });
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sysmon_protocol::ToolErrorKind;

    fn record(pid: u32, cpu: f32, mem: f32) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: format!("proc-{}", pid),
            cpu_percent: cpu,
            memory_percent: mem,
            memory_bytes: 0,
            user: None,
        }
    }

    fn pids(records: &[ProcessRecord]) -> Vec<u32> {
        records.iter().map(|r| r.pid).collect()
    }

    #[test]
    fn rank_by_cpu_breaks_ties_by_pid() {
        let records = vec![
            record(30, 5.0, 1.0),
            record(10, 250.0, 2.0),
            record(20, 5.0, 3.0),
            record(5, 5.0, 4.0),
            record(40, 0.0, 9.0),
        ];
        let ranked = rank_processes(records, SortKey::Cpu, 4);
        assert_eq!(pids(&ranked), vec![10, 5, 20, 30]);
    }

    #[test]
    fn rank_by_memory() {
        let records = vec![record(1, 90.0, 1.0), record(2, 0.0, 7.5), record(3, 1.0, 7.5)];
        let ranked = rank_processes(records, SortKey::Memory, 5);
        assert_eq!(pids(&ranked), vec![2, 3, 1]);
    }

    #[test]
    fn rank_truncates_and_keeps_short_lists() {
        let records: Vec<_> = (1..=3).map(|pid| record(pid, 1.0, 1.0)).collect();
        assert_eq!(rank_processes(records.clone(), SortKey::Cpu, 1).len(), 1);
        assert_eq!(rank_processes(records, SortKey::Cpu, 10).len(), 3);
    }

    #[tokio::test]
    async fn repeated_listings_are_finite_and_independent() {
        let provider = MetricsProvider::new();
        let first = provider.list_processes().await.unwrap();
        let second = provider.list_processes().await.unwrap();
        assert!(!first.is_empty());
        assert!(!second.is_empty());

        for records in [&first, &second] {
            let mut seen: Vec<u32> = pids(records);
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), records.len(), "pid repeated within a snapshot");
            assert!(records.iter().all(|r| r.cpu_percent >= 0.0));
            assert!(records
                .iter()
                .all(|r| (0.0..=100.0).contains(&r.memory_percent)));
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn threads_are_not_listed_as_processes() {
        let (release, parked) = std::sync::mpsc::channel::<()>();
        let parked = std::sync::Arc::new(std::sync::Mutex::new(parked));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let parked = parked.clone();
                std::thread::spawn(move || {
                    let _ = parked.lock().unwrap().recv();
                })
            })
            .collect();

        let own = std::process::id();
        let tids: Vec<u32> = std::fs::read_dir("/proc/self/task")
            .unwrap()
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
            .filter(|tid| *tid != own)
            .collect();
        assert!(tids.len() >= 4);

        let provider = MetricsProvider::new();
        let listed = provider.list_processes().await.unwrap();
        assert!(listed.iter().any(|r| r.pid == own));
        let leaked: Vec<u32> = pids(&listed).into_iter().filter(|pid| tids.contains(pid)).collect();
        assert_eq!(leaked, Vec::<u32>::new());

        drop(release);
        for worker in workers {
            worker.join().unwrap();
        }
    }

    #[tokio::test]
    async fn detail_of_own_process() {
        let pid = std::process::id();
        let detail = MetricsProvider::new().process_detail(pid).await.unwrap();
        assert_eq!(detail.record.pid, pid);
        assert!(!detail.record.name.is_empty());
    }

    #[tokio::test]
    async fn detail_of_missing_process() {
        let err = MetricsProvider::new()
            .process_detail(u32::MAX - 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn search_finds_own_process() {
        let provider = MetricsProvider::new();
        let own = provider
            .process_detail(std::process::id())
            .await
            .unwrap()
            .record
            .name;
        let found = provider.search_processes(&own.to_uppercase()).await.unwrap();
        assert!(found.iter().any(|r| r.pid == std::process::id()));
        assert!(found.windows(2).all(|w| w[0].pid < w[1].pid));
    }
}
