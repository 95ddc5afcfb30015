use super::Drivers;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    pub enabled: Cow<'static, [Drivers]>,

    pub websocket_driver_config: UniDriverConfig,
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            enabled: Cow::Borrowed(&[Drivers::Websocket]),

            websocket_driver_config: UniDriverConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniDriverConfig {
    pub port: u16,
    pub host: IpAddr,
}

impl Default for UniDriverConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 11452,
        }
    }
}
