use log::{debug, info};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::drivers::websocket::WsConnManager;
use crate::drivers::{Drivers, GracefulShutdown};
use crate::metrics::MetricsProvider;
use crate::protocols::v1::ProtocolV1;
use crate::tools::build_registry;
use tokio_util::sync::CancellationToken;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct ApplicationState {
    pub stop_token: CancellationToken,
    pub protocol_v1: Arc<ProtocolV1>,
    pub ws_connections: Mutex<Vec<JoinHandle<()>>>,
    pub ws_conn_manager: WsConnManager,
}
pub type AppState = Arc<ApplicationState>;

impl ApplicationState {
    pub fn new_shared(config: &AppConfig) -> AppState {
        let provider = Arc::new(MetricsProvider::new());
        let registry = Arc::new(build_registry(provider, &config.tools));
        debug!("{} tools registered", registry.names().len());
        let protocol_v1 = Arc::new(ProtocolV1::new(registry, &config.protocols.v1));

        Arc::new(ApplicationState {
            protocol_v1,
            ws_connections: Mutex::new(vec![]),
            stop_token: CancellationToken::new(),
            ws_conn_manager: WsConnManager::new(),
        })
    }
}

pub async fn run_app(drivers: &[Drivers]) -> anyhow::Result<()> {
    let config = AppConfig::get();
    debug!("config loaded: {}", serde_json::to_string_pretty(config)?);

    let state = ApplicationState::new_shared(config);
    let mut gs = GracefulShutdown::new();
    drivers
        .iter()
        .for_each(|driver_type| gs.add_driver(driver_type.new_driver(state.clone())));

    gs.watch(state.stop_token.clone()).await;
    info!("Bye.");
    Ok(())
}
