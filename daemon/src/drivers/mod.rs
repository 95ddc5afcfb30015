mod config;
mod driver;
mod graceful_shutdown;
pub mod stdio;
pub mod websocket;

use crate::app::AppState;
use crate::drivers::stdio::StdioDriver;
use crate::drivers::websocket::WsDriver;
pub use driver::Driver;
pub use graceful_shutdown::GracefulShutdown;
use serde::{Deserialize, Serialize};

pub use config::DriversConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Drivers {
    Websocket,
    Stdio,
}

impl Drivers {
    pub fn new_driver(&self, app_state: AppState) -> Box<dyn Driver> {
        match self {
            Drivers::Websocket => Box::new(WsDriver::new(app_state)),
            Drivers::Stdio => Box::new(StdioDriver::new(app_state)),
        }
    }
}
