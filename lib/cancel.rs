//! Cooperative cancellation.
//!
//! A token is a shared flag that the owning loop polls between non-blocking
//! I/O attempts. Cancelling never interrupts a thread; it only takes effect the
//! next time the loop checks.

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag. Clones observe the same flag.
#[derive(Clone, Default)]
pub struct CancelToken {
    // Padded: polled in a tight loop by one thread while another may write it.
    flag: Arc<CachePadded<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
