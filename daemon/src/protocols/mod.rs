mod config;
mod protocol;
pub mod v1;

pub use config::ProtocolConfig;
pub use protocol::Protocol;
