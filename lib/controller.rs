// Controller: start the acceptor, wait for the expected total, stop, drain once
use crate::acceptor::{Acceptor, AcceptorHandle};
use crate::config::ServerConfig;
use fanin_buffer::SharedLog;
use fanin_core::{IngestError, IngestResult, Message};
use fanin_transport::{TcpListenerTransport, TransportListener};
use log::{error, info};
use std::net::SocketAddr;
use std::thread;
use std::time::Instant;

/// The four phases of a run, entered strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AcceptAndCollect,
    SignalStop,
    JoinAll,
    DrainOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectReport {
    pub expected: usize,
    /// Log count after every worker was joined.
    pub collected: usize,
    pub drained: usize,
}

/// Owns one server run from bind to drain.
pub struct Controller {
    config: ServerConfig,
    log: SharedLog,
    acceptor: AcceptorHandle,
}

impl Controller {
    /// Validate `config`, bind the listener and start accepting.
    ///
    /// Bind and listen failures are returned here; nothing has been spawned yet.
    pub fn start(config: ServerConfig) -> IngestResult<Self> {
        config.validate()?;
        let listener = TcpListenerTransport::bind(config.bind_addr, config.backlog).map_err(
            |source| IngestError::Bind {
                addr: config.bind_addr,
                source,
            },
        )?;
        Self::with_listener(config, listener)
    }

    /// Start over an already bound listener.
    pub fn with_listener<L>(config: ServerConfig, listener: L) -> IngestResult<Self>
    where
        L: TransportListener + 'static,
    {
        config.validate()?;
        let log = SharedLog::with_capacity(config.expected_total());
        let acceptor = Acceptor::new(listener, log.clone(), &config).spawn()?;

        Ok(Controller {
            config,
            log,
            acceptor,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Messages received so far.
    pub fn received(&self) -> usize {
        self.log.snapshot_count()
    }

    /// Connections admitted so far.
    pub fn admitted(&self) -> usize {
        self.acceptor.admitted()
    }

    /// Run the remaining phases and hand every collected message to `consumer`.
    ///
    /// Blocks until the expected total has arrived (or `collect_timeout`
    /// elapses). A count that differs from the expected total after all workers
    /// are joined, or a drain that yields a different number of messages, is an
    /// invariant violation.
    pub fn run<F>(self, consumer: F) -> IngestResult<CollectReport>
    where
        F: FnMut(Message),
    {
        let Controller {
            config,
            log,
            acceptor,
        } = self;
        let expected = config.expected_total();

        enter(Phase::AcceptAndCollect);
        let started = Instant::now();
        loop {
            let count = log.snapshot_count();
            if count >= expected {
                break;
            }

            if acceptor.is_finished() {
                // Only a fatal accept error ends the acceptor without a stop.
                acceptor.join()?;
                return Err(IngestError::CountMismatch {
                    expected,
                    actual: log.snapshot_count(),
                });
            }

            if let Some(limit) = config.collect_timeout {
                if started.elapsed() >= limit {
                    acceptor.stop();
                    acceptor.join()?;
                    let received = log.snapshot_count();
                    error!("gave up after {:?} with {}/{} messages", limit, received, expected);
                    return Err(IngestError::Timeout { expected, received });
                }
            }

            thread::sleep(config.poll_interval);
        }

        enter(Phase::SignalStop);
        acceptor.stop();

        enter(Phase::JoinAll);
        let summary = acceptor.join()?;
        info!("all {} connections joined", summary.admitted);

        let collected = log.snapshot_count();
        if collected != expected {
            error!("Not enough messages were received! ({}/{})", collected, expected);
            return Err(IngestError::CountMismatch {
                expected,
                actual: collected,
            });
        }

        enter(Phase::DrainOnce);
        let drained = log.drain(consumer);
        if drained != collected {
            error!("Not all messages were collected! ({}/{})", drained, collected);
            return Err(IngestError::DrainMismatch {
                expected: collected,
                drained,
            });
        }

        info!("All {} messages were collected", drained);
        Ok(CollectReport {
            expected,
            collected,
            drained,
        })
    }

    /// Stop accepting and join every worker without draining.
    pub fn shutdown(self) -> IngestResult<usize> {
        self.acceptor.stop();
        let summary = self.acceptor.join()?;
        Ok(summary.admitted)
    }
}

fn enter(phase: Phase) {
    info!("phase: {:?}", phase);
}
