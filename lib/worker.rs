// ConnectionWorker: one thread per admitted connection
use crate::cancel::CancelToken;
use fanin_buffer::SharedLog;
use fanin_core::{ConnectionId, FrameAssembler, Message};
use fanin_transport::Transport;
use log::{debug, info, trace, warn};
use std::io::{self, ErrorKind};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopping,
    Stopped,
}

/// Why a worker left its read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Stop flag observed at the top of an iteration.
    Cancelled,
    PeerClosed,
    ReadError(ErrorKind),
}

/// Reads fixed-size frames from one connection into the shared log until it is
/// cancelled, the peer closes, or a read fails.
///
/// The connection is switched to non-blocking mode so the cancel token is
/// re-checked at least once per `poll_interval`. Errors end this worker only.
pub struct ConnectionWorker<T: Transport> {
    id: ConnectionId,
    transport: T,
    log: SharedLog,
    cancel: CancelToken,
    assembler: FrameAssembler,
    poll_interval: Duration,
    state: WorkerState,
    received: usize,
}

impl<T: Transport + 'static> ConnectionWorker<T> {
    pub fn new(
        id: ConnectionId,
        transport: T,
        log: SharedLog,
        cancel: CancelToken,
        frame_size: usize,
        poll_interval: Duration,
    ) -> Self {
        ConnectionWorker {
            id,
            transport,
            log,
            cancel,
            assembler: FrameAssembler::new(frame_size),
            poll_interval,
            state: WorkerState::Running,
            received: 0,
        }
    }

    pub fn spawn(self) -> io::Result<JoinHandle<WorkerExit>> {
        thread::Builder::new()
            .name(format!("fanin-{}", self.id))
            .spawn(move || self.run())
    }

    pub fn run(mut self) -> WorkerExit {
        let exit = match self.transport.set_nonblocking(true) {
            Ok(()) => self.read_loop(),
            Err(e) => {
                warn!("{}: cannot switch to non-blocking mode: {}", self.id, e);
                WorkerExit::ReadError(e.kind())
            }
        };

        self.transition(WorkerState::Stopping);
        if self.assembler.pending() > 0 {
            warn!(
                "{}: discarding {} bytes of an incomplete frame",
                self.id,
                self.assembler.pending()
            );
        }
        if let Err(e) = self.transport.shutdown() {
            debug!("{}: shutdown: {}", self.id, e);
        }
        self.transition(WorkerState::Stopped);

        info!(
            "{}: stopped ({:?}) after {} messages",
            self.id, exit, self.received
        );
        exit
    }

    fn read_loop(&mut self) -> WorkerExit {
        let mut buf = vec![0u8; self.assembler.frame_size()];

        loop {
            if self.cancel.is_cancelled() {
                return WorkerExit::Cancelled;
            }

            match self.transport.receive(&mut buf) {
                Ok(0) => {
                    info!("{}: peer closed the connection", self.id);
                    return WorkerExit::PeerClosed;
                }
                Ok(n) => self.store(n, &buf),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(self.poll_interval),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("{}: problem reading from socket: {}", self.id, e);
                    return WorkerExit::ReadError(e.kind());
                }
            }
        }
    }

    fn store(&mut self, n: usize, buf: &[u8]) {
        for frame in self.assembler.push(&buf[..n]) {
            self.log.append(Message::new(self.id, frame));
            self.received += 1;
            trace!("{}: stored message {}", self.id, self.received);
        }
    }

    fn transition(&mut self, next: WorkerState) {
        debug!("{}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanin_core::encode_frame;
    use std::collections::VecDeque;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    const POLL: Duration = Duration::from_millis(10);

    /// Replays a script of read results, then reports WouldBlock forever.
    struct ScriptedTransport {
        script: VecDeque<io::Result<Vec<u8>>>,
        shut_down: Arc<Mutex<bool>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<io::Result<Vec<u8>>>) -> (Self, Arc<Mutex<bool>>) {
            let shut_down = Arc::new(Mutex::new(false));
            let transport = ScriptedTransport {
                script: script.into(),
                shut_down: Arc::clone(&shut_down),
            };
            (transport, shut_down)
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&mut self, data: &[u8]) -> io::Result<usize> {
            Ok(data.len())
        }

        fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.script.pop_front() {
                Some(Ok(bytes)) => {
                    assert!(bytes.len() <= buf.len());
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from(ErrorKind::WouldBlock)),
            }
        }

        fn set_nonblocking(&mut self, _nonblocking: bool) -> io::Result<()> {
            Ok(())
        }

        fn peer_addr(&self) -> Option<SocketAddr> {
            None
        }

        fn shutdown(&mut self) -> io::Result<()> {
            *self.shut_down.lock().unwrap() = true;
            Ok(())
        }
    }

    fn worker(
        script: Vec<io::Result<Vec<u8>>>,
        log: &SharedLog,
        cancel: &CancelToken,
    ) -> (ConnectionWorker<ScriptedTransport>, Arc<Mutex<bool>>) {
        let (transport, shut_down) = ScriptedTransport::new(script);
        let worker = ConnectionWorker::new(
            ConnectionId(1),
            transport,
            log.clone(),
            cancel.clone(),
            8,
            POLL,
        );
        (worker, shut_down)
    }

    #[test]
    fn frames_are_appended_until_peer_closes() {
        let log = SharedLog::new();
        let (w, shut_down) = worker(
            vec![
                Ok(encode_frame("Hello", 8)),
                Ok(encode_frame("Apple", 8)),
                Ok(Vec::new()),
            ],
            &log,
            &CancelToken::new(),
        );

        assert_eq!(w.run(), WorkerExit::PeerClosed);
        assert!(*shut_down.lock().unwrap());

        let mut texts = Vec::new();
        log.drain(|m| texts.push(m.text().into_owned()));
        assert_eq!(texts, ["Hello", "Apple"]);
    }

    #[test]
    fn short_reads_are_accumulated() {
        let log = SharedLog::new();
        let frame = encode_frame("Car", 8);
        let (w, _) = worker(
            vec![
                Ok(frame[..2].to_vec()),
                Err(io::Error::from(ErrorKind::WouldBlock)),
                Ok(frame[2..].to_vec()),
                Ok(b"Gr".to_vec()),
                Ok(Vec::new()),
            ],
            &log,
            &CancelToken::new(),
        );

        assert_eq!(w.run(), WorkerExit::PeerClosed);
        // The trailing partial frame is dropped.
        assert_eq!(log.snapshot_count(), 1);
    }

    #[test]
    fn hard_read_error_stops_only_this_worker() {
        let log = SharedLog::new();
        let (w, shut_down) = worker(
            vec![
                Ok(encode_frame("Dog", 8)),
                Err(io::Error::from(ErrorKind::ConnectionReset)),
            ],
            &log,
            &CancelToken::new(),
        );

        assert_eq!(w.run(), WorkerExit::ReadError(ErrorKind::ConnectionReset));
        assert!(*shut_down.lock().unwrap());
        assert_eq!(log.snapshot_count(), 1);
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let log = SharedLog::new();
        let (w, _) = worker(
            vec![
                Err(io::Error::from(ErrorKind::Interrupted)),
                Ok(encode_frame("Green", 8)),
                Ok(Vec::new()),
            ],
            &log,
            &CancelToken::new(),
        );

        assert_eq!(w.run(), WorkerExit::PeerClosed);
        assert_eq!(log.snapshot_count(), 1);
    }

    #[test]
    fn cancelled_before_start_reads_nothing() {
        let log = SharedLog::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let (w, _) = worker(vec![Ok(encode_frame("Hello", 8))], &log, &cancel);

        assert_eq!(w.run(), WorkerExit::Cancelled);
        assert!(log.is_empty());
    }

    #[test]
    fn idle_worker_stops_within_a_few_poll_intervals() {
        let log = SharedLog::new();
        let cancel = CancelToken::new();
        let (w, shut_down) = worker(Vec::new(), &log, &cancel);

        let handle = w.spawn().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        let stop_requested = Instant::now();
        cancel.cancel();
        let exit = handle.join().unwrap();

        assert_eq!(exit, WorkerExit::Cancelled);
        assert!(stop_requested.elapsed() < Duration::from_millis(200));
        assert!(*shut_down.lock().unwrap());
    }
}
