mod actions;
mod catalog;
pub mod retcode;
pub mod status;

pub use actions::*;
pub use catalog::*;
