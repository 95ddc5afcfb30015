mod config;
mod protocol;

pub use config::ProtocolV1Config;
pub use protocol::ProtocolV1;
