pub mod error;
pub mod status;
pub mod v1;

pub use error::{ToolError, ToolErrorKind};
