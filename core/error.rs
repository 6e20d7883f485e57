// Error taxonomy for the ingestion server
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Socket, bind or listen failed; nothing can run without a listener.
    #[error("failed to listen on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("accept failed")]
    Accept(#[source] io::Error),

    #[error("failed to spawn {what} thread")]
    Spawn {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("acceptor thread panicked")]
    AcceptorPanicked,

    #[error("expected {expected} messages after shutdown, log holds {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("drained {drained} messages, log counted {expected}")]
    DrainMismatch { expected: usize, drained: usize },

    #[error("timed out with {received} of {expected} messages received")]
    Timeout { expected: usize, received: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("logger setup failed: {0}")]
    Logger(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl IngestError {
    /// Data loss or double counting detected after the fact.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            IngestError::CountMismatch { .. } | IngestError::DrainMismatch { .. }
        )
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
