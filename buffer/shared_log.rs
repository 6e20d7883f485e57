// SharedLog: append-only message arena behind a single lock
use fanin_core::Message;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct LogInner {
    entries: Vec<Message>,
    count: usize,
}

/// Append-only collection of received messages, shared between every
/// connection worker (writers) and the controller (count reader, drainer).
///
/// `count` and the arena are only touched while the lock is held, so a reader
/// of `snapshot_count` always sees the length of a consistent log. No I/O and no
/// allocation other than the arena push happens under the lock.
pub struct SharedLog {
    inner: Arc<Mutex<LogInner>>,
}

impl SharedLog {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-size the arena, typically to the expected total.
    pub fn with_capacity(capacity: usize) -> Self {
        SharedLog {
            inner: Arc::new(Mutex::new(LogInner {
                entries: Vec::with_capacity(capacity),
                count: 0,
            })),
        }
    }

    // Writers only do infallible push/increment under the lock, so a poisoned
    // lock still guards a consistent log.
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one message. O(1) amortized.
    pub fn append(&self, message: Message) {
        let mut inner = self.lock();
        inner.entries.push(message);
        inner.count += 1;
    }

    /// Number of messages appended and not yet drained.
    pub fn snapshot_count(&self) -> usize {
        self.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot_count() == 0
    }

    /// Hand every stored message to `consumer` in append order, releasing each
    /// one afterwards, and return how many were drained.
    ///
    /// Must only be called once all appenders have been joined; the log does not
    /// guard against appends racing a drain. A second call returns 0.
    pub fn drain<F>(&self, mut consumer: F) -> usize
    where
        F: FnMut(Message),
    {
        let entries = {
            let mut inner = self.lock();
            inner.count = 0;
            std::mem::take(&mut inner.entries)
        };

        let mut drained = 0;
        for message in entries {
            consumer(message);
            drained += 1;
        }
        drained
    }
}

impl Default for SharedLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SharedLog {
    fn clone(&self) -> Self {
        SharedLog {
            inner: Arc::clone(&self.inner),
        }
    }
}
