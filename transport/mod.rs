// Transport module: stream abstractions used by the acceptor, workers and client
pub mod traits;
pub mod tcp;

pub use traits::*;
pub use tcp::*;
