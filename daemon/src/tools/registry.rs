use crate::metrics::MetricsProvider;
use crate::tools::schema::{ToolArgs, ToolSchema};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use sysmon_protocol::v1::action::{ToolDescriptor, ToolResults};
use sysmon_protocol::ToolError;

pub type ToolResult = Result<ToolResults, ToolError>;

// 处理器函数类型
type HandlerFn = dyn Fn(Arc<MetricsProvider>, ToolArgs) -> BoxFuture<'static, ToolResult>
    + Send
    + Sync
    + 'static;

struct RegisteredTool {
    description: &'static str,
    schema: ToolSchema,
    handler: Arc<HandlerFn>,
}

/// Fixed catalog of callable tools. Built once at startup, then only read.
pub struct ToolRegistry {
    provider: Arc<MetricsProvider>,
    tools: HashMap<&'static str, RegisteredTool>,
    order: Vec<&'static str>,
}

impl ToolRegistry {
    pub fn new(provider: Arc<MetricsProvider>) -> Self {
        Self {
            provider,
            tools: HashMap::new(),
            order: vec![],
        }
    }

    /// Adds a tool. Panics on a duplicate name, which is a wiring bug.
    pub fn register<F>(
        &mut self,
        name: &'static str,
        description: &'static str,
        schema: ToolSchema,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(Arc<MetricsProvider>, ToolArgs) -> BoxFuture<'static, ToolResult>
            + Send
            + Sync
            + 'static,
    {
        let previous = self.tools.insert(
            name,
            RegisteredTool {
                description,
                schema,
                handler: Arc::new(handler),
            },
        );
        assert!(previous.is_none(), "tool `{}` registered twice", name);
        self.order.push(name);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> &[&'static str] {
        &self.order
    }

    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| {
                self.tools
                    .get(name)
                    .map(|tool| tool.schema.describe(name, tool.description))
            })
            .collect()
    }

    /// Looks up, validates and runs one invocation. Single attempt, no retry.
    pub async fn dispatch(&self, name: &str, args: &Map<String, Value>) -> ToolResult {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let validated = tool.schema.validate(args)?;

        debug!("dispatching tool `{}`", name);
        let future = (tool.handler)(self.provider.clone(), validated);
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                warn!("tool `{}` panicked", name);
                Err(ToolError::unavailable(format!(
                    "tool `{}` failed unexpectedly",
                    name
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::ArgSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sysmon_protocol::status::NetworkSnapshot;
    use sysmon_protocol::v1::action::ArgType;
    use sysmon_protocol::ToolErrorKind;

    fn empty_network() -> ToolResults {
        ToolResults::Network(NetworkSnapshot {
            interfaces: vec![],
            total_received_bytes: 0,
            total_transmitted_bytes: 0,
            timestamp_ms: 0,
        })
    }

    async fn explode(_: Arc<MetricsProvider>, _: ToolArgs) -> ToolResult {
        panic!("boom")
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new(Arc::new(MetricsProvider::new()));
        registry
            .register("noop", "does nothing", ToolSchema::new(), |_, _| {
                async { Ok::<_, ToolError>(empty_network()) }.boxed()
            })
            .register(
                "echo_name",
                "requires a name",
                ToolSchema::new().arg(ArgSpec::required("name", ArgType::String)),
                |_, args| {
                    let outcome = args.string("name").map(|_| empty_network());
                    async move { outcome }.boxed()
                },
            )
            .register("explode", "panics", ToolSchema::new(), |provider, args| {
                explode(provider, args).boxed()
            });
        registry
    }

    #[tokio::test]
    async fn unknown_tool_leaves_catalog_unchanged() {
        let registry = registry();
        let before = registry.names().to_vec();
        let err = registry
            .dispatch("get_nonexistent", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("get_nonexistent".to_string()));
        assert_eq!(registry.names(), before.as_slice());
        assert!(!registry.contains("get_nonexistent"));
    }

    #[tokio::test]
    async fn validation_runs_before_handler() {
        let registry = registry();
        let err = registry
            .dispatch("echo_name", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::InvalidArgument);

        let args = json!({ "name": "x" }).as_object().cloned().unwrap();
        assert_eq!(
            registry.dispatch("echo_name", &args).await.unwrap(),
            empty_network()
        );
    }

    #[tokio::test]
    async fn panicking_handler_becomes_failure() {
        let registry = registry();
        let err = registry.dispatch("explode", &Map::new()).await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::ProviderUnavailable);
        // still serving
        assert!(registry.dispatch("noop", &Map::new()).await.is_ok());
    }

    #[test]
    fn no_build_profile_aborts_on_panic() {
        // catch_unwind in dispatch is a no-op under panic = "abort"
        let manifest = include_str!("../../../Cargo.toml");
        assert!(manifest.contains("[profile.fat-release]"));
        assert!(!manifest
            .lines()
            .any(|line| line.replace(' ', "").starts_with("panic=\"abort\"")));
    }

    #[test]
    fn describe_keeps_registration_order() {
        let names: Vec<String> = registry().describe().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["noop", "echo_name", "explode"]);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_registration_panics() {
        let mut registry = registry();
        registry.register("noop", "again", ToolSchema::new(), |_, _| {
            async { Ok::<_, ToolError>(empty_network()) }.boxed()
        });
    }
}
