use crate::metrics::{rank_processes, MetricsProvider, ROOT_PATH};
use crate::tools::config::ToolsConfig;
use crate::tools::registry::{ToolRegistry, ToolResult};
use crate::tools::schema::{ArgSpec, ToolArgs, ToolSchema};
use futures::FutureExt;
use log::warn;
use serde_json::Value;
use std::sync::Arc;
use sysmon_protocol::status::SortKey;
use sysmon_protocol::v1::action::{ArgType, ToolResults};
use sysmon_protocol::ToolError;

/// Registers the whole tool catalog against `provider`.
pub fn build_registry(provider: Arc<MetricsProvider>, config: &ToolsConfig) -> ToolRegistry {
    let default_limit = if config.default_limit == 0 {
        warn!("tools.default_limit must be positive, falling back to 5");
        5
    } else {
        config.default_limit
    };

    let mut registry = ToolRegistry::new(provider);
    registry
        .register(
            "get_cpu_info",
            "Current CPU utilization: overall and per-core percentages and logical core count.",
            ToolSchema::new(),
            |provider, args| get_cpu_info(provider, args).boxed(),
        )
        .register(
            "get_memory_info",
            "Current system-wide RAM and swap usage in bytes and percent.",
            ToolSchema::new(),
            |provider, args| get_memory_info(provider, args).boxed(),
        )
        .register(
            "get_disk_info",
            "Usage of the filesystem containing `path` (default: root).",
            ToolSchema::new().arg(
                ArgSpec::optional("path", ArgType::String, Value::from(ROOT_PATH))
                    .check("valid filesystem path", valid_path),
            ),
            |provider, args| get_disk_info(provider, args).boxed(),
        )
        .register(
            "get_top_processes",
            "Top processes by CPU or memory usage with pid, name, CPU% and memory%.",
            ToolSchema::new()
                .arg(
                    ArgSpec::optional("limit", ArgType::Integer, Value::from(default_limit))
                        .check("> 0", positive),
                )
                .arg(ArgSpec::optional(
                    "sort_by",
                    sort_key_type(),
                    Value::from(config.default_sort_by.as_str()),
                )),
            |provider, args| get_top_processes(provider, args).boxed(),
        )
        .register(
            "get_process_info",
            "Details of one process: status, start time, command line, memory and user.",
            ToolSchema::new().arg(
                ArgSpec::required("pid", ArgType::Integer).check("0 <= pid <= 4294967295", pid_range),
            ),
            |provider, args| get_process_info(provider, args).boxed(),
        )
        .register(
            "search_process_by_name",
            "Processes whose name contains `name`, case-insensitive.",
            ToolSchema::new()
                .arg(ArgSpec::required("name", ArgType::String).check("non-empty", non_empty)),
            |provider, args| search_process_by_name(provider, args).boxed(),
        )
        .register(
            "get_system_summary",
            "One-shot overview: CPU, memory, root disk, process count, boot time and uptime.",
            ToolSchema::new(),
            |provider, args| get_system_summary(provider, args).boxed(),
        )
        .register(
            "get_network_stats",
            "Cumulative per-interface network counters and totals.",
            ToolSchema::new(),
            |provider, args| get_network_stats(provider, args).boxed(),
        );
    registry
}

fn sort_key_type() -> ArgType {
    ArgType::Enum {
        choices: SortKey::VARIANTS.iter().map(|s| s.to_string()).collect(),
    }
}

fn positive(value: &Value) -> Result<(), String> {
    match value.as_i64() {
        Some(n) if n > 0 => Ok(()),
        None if value.is_u64() => Err(format!("must be at most {}", i64::MAX)),
        _ => Err("must be greater than 0".to_string()),
    }
}

fn pid_range(value: &Value) -> Result<(), String> {
    match value.as_i64() {
        Some(n) if u32::try_from(n).is_ok() => Ok(()),
        _ => Err("must be between 0 and 4294967295".to_string()),
    }
}

fn non_empty(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err("must not be empty".to_string()),
    }
}

fn valid_path(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some("") => Err("must not be empty".to_string()),
        Some(s) if s.contains('\0') => Err("must not contain NUL bytes".to_string()),
        Some(_) => Ok(()),
        None => Err("must be a string".to_string()),
    }
}

async fn get_cpu_info(provider: Arc<MetricsProvider>, _: ToolArgs) -> ToolResult {
    Ok(ToolResults::Cpu(provider.sample_cpu().await?))
}

async fn get_memory_info(provider: Arc<MetricsProvider>, _: ToolArgs) -> ToolResult {
    Ok(ToolResults::Memory(provider.sample_memory().await?))
}

async fn get_disk_info(provider: Arc<MetricsProvider>, args: ToolArgs) -> ToolResult {
    let path = args.string("path")?;
    Ok(ToolResults::Disk(provider.sample_disk(path).await?))
}

async fn get_top_processes(provider: Arc<MetricsProvider>, args: ToolArgs) -> ToolResult {
    let limit = usize::try_from(args.integer("limit")?)
        .map_err(|_| ToolError::invalid("limit", "must be greater than 0"))?;
    let sort_by: SortKey = args
        .string("sort_by")?
        .parse()
        .map_err(|reason: String| ToolError::invalid("sort_by", reason))?;

    let records = provider.list_processes().await?;
    let total_count = records.len();
    Ok(ToolResults::TopProcesses {
        top_processes: rank_processes(records, sort_by, limit),
        total_count,
        sorted_by: sort_by,
    })
}

async fn get_process_info(provider: Arc<MetricsProvider>, args: ToolArgs) -> ToolResult {
    let pid = u32::try_from(args.integer("pid")?)
        .map_err(|_| ToolError::invalid("pid", "must be between 0 and 4294967295"))?;
    Ok(ToolResults::Process(provider.process_detail(pid).await?))
}

async fn search_process_by_name(provider: Arc<MetricsProvider>, args: ToolArgs) -> ToolResult {
    let processes = provider.search_processes(args.string("name")?.trim()).await?;
    Ok(ToolResults::MatchingProcesses { processes })
}

async fn get_system_summary(provider: Arc<MetricsProvider>, _: ToolArgs) -> ToolResult {
    Ok(ToolResults::Summary(provider.summary().await?))
}

async fn get_network_stats(provider: Arc<MetricsProvider>, _: ToolArgs) -> ToolResult {
    Ok(ToolResults::Network(provider.sample_network().await?))
}
