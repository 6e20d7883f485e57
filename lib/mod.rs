// fanin: bounded fan-in ingestion server.
//
// One acceptor thread admits up to `capacity` connections, one worker thread per
// connection appends fixed-size frames to a shared log, and the controller
// stops everything once `capacity * messages_per_client` frames have arrived
// and drains the log exactly once.

// Re-export core types and the shared log
pub use fanin_buffer::SharedLog;
pub use fanin_core::*;

pub mod acceptor;
pub mod cancel;
pub mod config;
pub mod controller;
pub mod logger;
pub mod worker;

pub use acceptor::{Acceptor, AcceptorHandle, AcceptorSummary};
pub use cancel::CancelToken;
pub use config::ServerConfig;
pub use controller::{CollectReport, Controller, Phase};
pub use logger::init_logger;
pub use worker::{ConnectionWorker, WorkerExit, WorkerState};
