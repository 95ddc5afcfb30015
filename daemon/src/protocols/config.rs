use super::v1::ProtocolV1Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProtocolConfig {
    pub v1: ProtocolV1Config,
}
