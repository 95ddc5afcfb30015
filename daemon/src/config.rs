use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::storage::file::{Config, FileIoWithBackup};
use crate::tools::ToolsConfig;
use crate::{drivers::DriversConfig, protocols::ProtocolConfig};

const CONFIG_ENV: &str = "SYSMON_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";

/// immutable through full lifetime of app, unless restart app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub drivers: DriversConfig,
    pub protocols: ProtocolConfig,
    pub tools: ToolsConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            drivers: DriversConfig::default(),
            protocols: ProtocolConfig::default(),
            tools: ToolsConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl FileIoWithBackup for AppConfig {}

impl Config for AppConfig {
    type ConfigType = AppConfig;
}

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

impl AppConfig {
    /// `$SYSMON_CONFIG`, or `config.json` in the working directory.
    pub fn path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load() -> anyhow::Result<AppConfig> {
        Self::load_config_or_default(Self::path(), Self::default)
    }

    /// First call wins; later calls are ignored.
    pub fn init(config: AppConfig) -> &'static AppConfig {
        APP_CONFIG.get_or_init(|| config)
    }

    pub fn get() -> &'static AppConfig {
        APP_CONFIG.get_or_init(AppConfig::default)
    }
}
