//! Sleeper trait so bounded waits are deterministic in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealSleeper;

impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Records calls without sleeping; bounded waits run their full
/// iteration count instantly under test.
#[derive(Debug, Default)]
pub struct MockSleeper {
    call_count: AtomicU64,
    total_ms: AtomicU64,
}

impl MockSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn total_slept(&self) -> Duration {
        Duration::from_millis(self.total_ms.load(Ordering::SeqCst))
    }
}

impl Sleeper for MockSleeper {
    fn sleep(&self, duration: Duration) {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.total_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}
