//! One-shot stop request for a command source that blocks in an OS loop.
//!
//! The source [`attach`](QuitSignal::attach)es the id of the thread running
//! its loop; any other thread may [`request`](QuitSignal::request) a stop.
//! Whichever of the two happens second sees the other, so a stop requested
//! before the loop starts is not lost.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Thread id `0` means "not attached yet".
#[derive(Debug, Default)]
pub struct QuitSignal {
    target: AtomicU32,
    requested: AtomicBool,
}

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the thread whose loop should be woken on stop.
    ///
    /// Returns `false` if a stop was already requested; the caller should
    /// not enter its loop.
    pub fn attach(&self, thread_id: u32) -> bool {
        self.target.store(thread_id, Ordering::SeqCst);
        !self.requested.load(Ordering::SeqCst)
    }

    /// Request a stop.
    ///
    /// Returns the thread to wake, or `None` if nothing is attached yet or
    /// a stop was already requested.
    pub fn request(&self) -> Option<u32> {
        if self.requested.swap(true, Ordering::SeqCst) {
            return None;
        }
        match self.target.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
