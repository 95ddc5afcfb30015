mod process;
mod system_info;

pub use process::*;
pub use system_info::*;
