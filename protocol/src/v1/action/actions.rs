use crate::error::ToolErrorKind;
use crate::status::{
    CpuSnapshot, DiskSnapshot, MemorySnapshot, NetworkSnapshot, ProcessDetail, ProcessRecord,
    SortKey, SystemSummary,
};
use crate::v1::action::retcode::Retcode;
use crate::v1::action::status::ActionStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One tool invocation as received from a transport.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub id: Uuid,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum ToolResults {
    Failure {
        kind: ToolErrorKind,
    },

    Cpu(CpuSnapshot),
    Memory(MemorySnapshot),
    Disk(DiskSnapshot),
    TopProcesses {
        top_processes: Vec<ProcessRecord>,
        total_count: usize,
        sorted_by: SortKey,
    },

    // supplementary read-only tools
    Process(ProcessDetail),
    MatchingProcesses {
        processes: Vec<ProcessRecord>,
    },
    Summary(SystemSummary),
    Network(NetworkSnapshot),
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct ToolResponse {
    pub status: ActionStatus,
    pub data: ToolResults,
    #[serde(flatten)]
    pub retcode: Retcode,
    pub id: Uuid,
}
