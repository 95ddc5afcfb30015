use serde::{Deserialize, Serialize};
use sysmon_protocol::status::SortKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub default_limit: u32,
    pub default_sort_by: SortKey,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            default_sort_by: SortKey::Cpu,
        }
    }
}
