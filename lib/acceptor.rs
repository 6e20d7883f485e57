// Acceptor: owns the listening socket and the registry of connection workers
use crate::cancel::CancelToken;
use crate::config::ServerConfig;
use crate::worker::{ConnectionWorker, WorkerExit};
use fanin_buffer::SharedLog;
use fanin_core::{ConnectionId, IngestError, IngestResult};
use fanin_transport::TransportListener;
use log::{debug, error, info};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Registry entry for one admitted connection.
struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
    cancel: CancelToken,
    thread: JoinHandle<WorkerExit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptorSummary {
    /// Connections admitted over the acceptor's lifetime.
    pub admitted: usize,
}

/// Accepts up to `capacity` connections and runs one [`ConnectionWorker`] per
/// connection.
///
/// Slots are never reused: once `capacity` connections have been admitted,
/// further clients stay in the listen backlog until the acceptor stops. On stop
/// every worker is cancelled, all of them are joined, and only then is the
/// listener closed.
pub struct Acceptor<L: TransportListener> {
    listener: L,
    log: SharedLog,
    cancel: CancelToken,
    capacity: usize,
    frame_size: usize,
    poll_interval: Duration,
    admitted: Arc<AtomicUsize>,
}

impl<L: TransportListener + 'static> Acceptor<L> {
    pub fn new(listener: L, log: SharedLog, config: &ServerConfig) -> Self {
        Acceptor {
            listener,
            log,
            cancel: CancelToken::new(),
            capacity: config.capacity,
            frame_size: config.frame_size,
            poll_interval: config.poll_interval,
            admitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn spawn(self) -> IngestResult<AcceptorHandle> {
        let local_addr = self.listener.local_addr()?;
        let cancel = self.cancel.clone();
        let admitted = Arc::clone(&self.admitted);

        let thread = thread::Builder::new()
            .name("fanin-acceptor".into())
            .spawn(move || self.run())
            .map_err(|source| IngestError::Spawn {
                what: "acceptor",
                source,
            })?;

        Ok(AcceptorHandle {
            cancel,
            admitted,
            local_addr,
            thread: Some(thread),
        })
    }

    pub fn run(mut self) -> IngestResult<AcceptorSummary> {
        self.listener.set_nonblocking(true)?;
        info!("Accepting clients on {}", self.listener.local_addr()?);

        let mut handles = Vec::with_capacity(self.capacity);
        let result = self.accept_loop(&mut handles);
        info!("Not accepting any more clients");

        Self::stop_workers(handles);
        debug!("closing listener");

        result.map(|()| AcceptorSummary {
            admitted: self.admitted.load(Ordering::Acquire),
        })
    }

    fn accept_loop(&mut self, handles: &mut Vec<ConnectionHandle>) -> IngestResult<()> {
        while !self.cancel.is_cancelled() {
            if handles.len() >= self.capacity {
                thread::sleep(self.poll_interval);
                continue;
            }

            match self.listener.accept() {
                Ok((connection, peer)) => {
                    let id = ConnectionId(handles.len() as u32 + 1);
                    let cancel = CancelToken::new();
                    let worker = ConnectionWorker::new(
                        id,
                        connection,
                        self.log.clone(),
                        cancel.clone(),
                        self.frame_size,
                        self.poll_interval,
                    );
                    let thread = worker.spawn().map_err(|source| IngestError::Spawn {
                        what: "connection worker",
                        source,
                    })?;

                    info!("Client connected: {} from {}", id, peer);
                    handles.push(ConnectionHandle {
                        id,
                        peer,
                        cancel,
                        thread,
                    });
                    self.admitted.fetch_add(1, Ordering::Release);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(self.poll_interval),
                // Client gave up before we got to it; not a listener failure.
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::ConnectionAborted) => {}
                Err(e) => {
                    error!("accept failed: {}", e);
                    return Err(IngestError::Accept(e));
                }
            }
        }
        Ok(())
    }

    fn stop_workers(handles: Vec<ConnectionHandle>) {
        for handle in &handles {
            handle.cancel.cancel();
        }

        for handle in handles {
            match handle.thread.join() {
                Ok(exit) => debug!("{} ({}) joined: {:?}", handle.id, handle.peer, exit),
                Err(_) => error!("{} ({}) worker panicked", handle.id, handle.peer),
            }
        }
    }
}

/// Control side of a running acceptor thread.
///
/// Dropping the handle without calling [`AcceptorHandle::join`] stops and joins
/// the acceptor.
pub struct AcceptorHandle {
    cancel: CancelToken,
    admitted: Arc<AtomicUsize>,
    local_addr: SocketAddr,
    thread: Option<JoinHandle<IngestResult<AcceptorSummary>>>,
}

impl AcceptorHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections admitted so far.
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::Acquire)
    }

    /// Ask the acceptor to stop; takes effect at its next poll.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// True once the acceptor thread has returned, whether stopped or failed.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the acceptor and all of its workers to exit.
    pub fn join(mut self) -> IngestResult<AcceptorSummary> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| IngestError::AcceptorPanicked)?,
            None => Err(IngestError::AcceptorPanicked),
        }
    }
}

impl Drop for AcceptorHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel.cancel();
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanin_transport::Transport;
    use std::io;

    struct NullTransport;

    impl Transport for NullTransport {
        fn send(&mut self, data: &[u8]) -> io::Result<usize> {
            Ok(data.len())
        }
        fn receive(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::WouldBlock))
        }
        fn set_nonblocking(&mut self, _nonblocking: bool) -> io::Result<()> {
            Ok(())
        }
        fn peer_addr(&self) -> Option<SocketAddr> {
            None
        }
        fn shutdown(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Hands out `connections` idle transports, then fails or would-block.
    struct FakeListener {
        connections: usize,
        then: ErrorKind,
    }

    impl TransportListener for FakeListener {
        type Connection = NullTransport;

        fn accept(&mut self) -> io::Result<(NullTransport, SocketAddr)> {
            if self.connections == 0 {
                return Err(io::Error::from(self.then));
            }
            self.connections -= 1;
            Ok((NullTransport, "127.0.0.1:40000".parse().unwrap()))
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok("127.0.0.1:8001".parse().unwrap())
        }

        fn set_nonblocking(&mut self, _nonblocking: bool) -> io::Result<()> {
            Ok(())
        }
    }

    fn config(capacity: usize) -> ServerConfig {
        ServerConfig {
            capacity,
            poll_interval: Duration::from_millis(5),
            ..ServerConfig::default()
        }
    }

    fn wait_for(handle: &AcceptorHandle, admitted: usize) {
        for _ in 0..400 {
            if handle.admitted() == admitted {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("only {} of {} connections admitted", handle.admitted(), admitted);
    }

    #[test]
    fn admission_stops_at_capacity() {
        let listener = FakeListener {
            connections: 6,
            then: ErrorKind::WouldBlock,
        };
        let handle = Acceptor::new(listener, SharedLog::new(), &config(4))
            .spawn()
            .unwrap();

        wait_for(&handle, 4);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(handle.admitted(), 4);

        handle.stop();
        assert_eq!(handle.join().unwrap(), AcceptorSummary { admitted: 4 });
    }

    #[test]
    fn hard_accept_error_is_fatal() {
        let listener = FakeListener {
            connections: 1,
            then: ErrorKind::PermissionDenied,
        };
        let handle = Acceptor::new(listener, SharedLog::new(), &config(4))
            .spawn()
            .unwrap();

        // No stop requested: the acceptor exits on its own and joins its worker.
        let err = handle.join().unwrap_err();
        assert!(matches!(err, IngestError::Accept(ref e) if e.kind() == ErrorKind::PermissionDenied));
    }

    #[test]
    fn dropping_the_handle_stops_the_acceptor() {
        let listener = FakeListener {
            connections: 2,
            then: ErrorKind::WouldBlock,
        };
        let handle = Acceptor::new(listener, SharedLog::new(), &config(4))
            .spawn()
            .unwrap();
        wait_for(&handle, 2);
        drop(handle);
    }

    #[test]
    fn local_addr_is_reported_before_start() {
        let listener = FakeListener {
            connections: 0,
            then: ErrorKind::WouldBlock,
        };
        let handle = Acceptor::new(listener, SharedLog::new(), &config(1))
            .spawn()
            .unwrap();
        assert_eq!(handle.local_addr().port(), 8001);
        handle.stop();
        assert_eq!(handle.join().unwrap().admitted, 0);
    }
}
