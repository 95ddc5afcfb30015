use serde::{Deserialize, Serialize};
use sysinfo::{CpuRefreshKind, RefreshKind, System};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolV1Config {
    pub max_parallel_requests: u16,
    pub max_pending_requests: u16,
}

impl Default for ProtocolV1Config {
    fn default() -> Self {
        let cpu_count = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing()),
        )
        .cpus()
        .len()
        .clamp(1, u16::MAX as usize) as u16;
        Self {
            max_parallel_requests: cpu_count,
            max_pending_requests: cpu_count.saturating_mul(4),
        }
    }
}
