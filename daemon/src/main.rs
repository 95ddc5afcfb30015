use crate::app::run_app;
use crate::config::AppConfig;
use crate::drivers::Drivers;

mod app;
pub mod config;
mod drivers;
mod metrics;
mod protocols;
mod storage;
mod tools;

fn init_logger(config: &AppConfig) {
    // RUST_LOG 优先于配置文件
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--default-config") {
        println!("{}", serde_json::to_string_pretty(&AppConfig::default())?);
        return Ok(());
    }

    let config = AppConfig::init(AppConfig::load()?);
    init_logger(config);

    let drivers = if args.iter().any(|arg| arg == "--stdio") {
        vec![Drivers::Stdio]
    } else {
        config.drivers.enabled.to_vec()
    };
    run_app(&drivers).await
}
