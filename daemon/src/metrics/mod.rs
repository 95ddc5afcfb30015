//! Point-in-time OS statistics.
//!
//! Every call builds its own `sysinfo` handle and returns a fresh snapshot,
//! nothing is cached between calls. Blocking reads (process table, filesystem
//! statistics) run on the tokio blocking pool so concurrent invocations do not
//! starve the runtime.

mod process;
mod system_info;

use std::time::Duration;
use sysmon_protocol::ToolError;

pub use process::rank_processes;

/// Mount queried when the caller gives no path.
#[cfg(not(windows))]
pub const ROOT_PATH: &str = "/";
#[cfg(windows)]
pub const ROOT_PATH: &str = "C:\\";

const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
const PROCESS_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

/// Owned once by the server and shared behind an `Arc`.
#[derive(Debug)]
pub struct MetricsProvider {
    cpu_interval: Duration,
    process_interval: Duration,
}

impl Default for MetricsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider {
    pub fn new() -> Self {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            log::warn!("sysinfo does not support this platform, every sample will fail");
        }
        Self {
            cpu_interval: CPU_SAMPLE_INTERVAL.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
            process_interval: PROCESS_SAMPLE_INTERVAL.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    fn ensure_supported(&self) -> Result<(), ToolError> {
        if sysinfo::IS_SUPPORTED_SYSTEM {
            Ok(())
        } else {
            Err(ToolError::unavailable(format!(
                "metrics are not available on {}",
                std::env::consts::OS
            )))
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ToolError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ToolError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| ToolError::unavailable(format!("metrics query aborted: {}", err)))?
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
