mod catalog;
mod config;
mod registry;
mod schema;

pub use catalog::build_registry;
pub use config::ToolsConfig;
pub use registry::ToolRegistry;
