//! Cooperative shutdown.
//!
//! A single shared flag is handed to the listener and the cleanup worker;
//! both check it at every loop boundary and between sleep increments. The
//! accept path polls with a short timeout instead of blocking indefinitely,
//! so tripping the flag is enough to unblock it; no loopback wake-up
//! connection is needed. Work already in flight for one connection runs to
//! completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared cancellation flag for the background loops.
#[derive(Clone)]
pub struct ShutdownFlag {
    running: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Trip the flag. Loops exit at their next check.
    pub fn trigger(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Sleep for `total`, in one-second increments, returning early (false)
    /// as soon as shutdown is triggered.
    pub fn sleep_interruptibly(&self, total: Duration) -> bool {
        let mut remaining = total;
        let step = Duration::from_secs(1);
        while !remaining.is_zero() {
            if !self.is_running() {
                return false;
            }
            let chunk = remaining.min(step);
            std::thread::sleep(chunk);
            remaining -= chunk;
        }
        self.is_running()
    }
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}
