use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    /// Per-core scale: one saturated core is 100, so this may exceed 100.
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessDetail {
    #[serde(flatten)]
    pub record: ProcessRecord,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_pid: Option<u32>,
    /// Unix seconds.
    pub start_time: u64,
    /// First few command line arguments joined by a space.
    pub cmdline: String,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
}

impl SortKey {
    pub const VARIANTS: &'static [&'static str] = &["cpu", "memory"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Cpu => "cpu",
            SortKey::Memory => "memory",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(SortKey::Cpu),
            "memory" => Ok(SortKey::Memory),
            other => Err(format!(
                "expected one of {}, got `{}`",
                Self::VARIANTS.join(", "),
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_parses_known_values_only() {
        assert_eq!("cpu".parse::<SortKey>(), Ok(SortKey::Cpu));
        assert_eq!("memory".parse::<SortKey>(), Ok(SortKey::Memory));
        assert!("name".parse::<SortKey>().is_err());
        assert!("CPU".parse::<SortKey>().is_err());
    }

    #[test]
    fn process_detail_flattens_record() {
        let detail = ProcessDetail {
            record: ProcessRecord {
                pid: 42,
                name: "init".to_string(),
                cpu_percent: 0.0,
                memory_percent: 0.5,
                memory_bytes: 4096,
                user: None,
            },
            status: "Sleeping".to_string(),
            parent_pid: None,
            start_time: 0,
            cmdline: "/sbin/init".to_string(),
            timestamp_ms: 0,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["pid"], 42);
        assert_eq!(value["cmdline"], "/sbin/init");
        assert!(value.get("record").is_none());
    }
}
