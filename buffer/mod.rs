// Buffer module: the mutex-guarded message log shared by all connection workers
pub mod shared_log;

pub use shared_log::*;
