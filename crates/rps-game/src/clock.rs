use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for the controllers. Injected so the state machines are
/// testable (and replayable) without waiting on wall-clock time.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock advanced by hand. Clones share the same timeline, so a test or
/// replay harness can keep one handle while a controller owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    epoch: Instant,
    elapsed_micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            elapsed_micros: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed_micros
            .fetch_add(by.as_micros() as u64, Ordering::Relaxed);
    }

    /// Jumps the timeline to an absolute offset from the epoch
    pub fn set_elapsed(&self, elapsed: Duration) {
        self.elapsed_micros
            .store(elapsed.as_micros() as u64, Ordering::Relaxed);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.epoch + Duration::from_micros(self.elapsed_micros.load(Ordering::Relaxed))
    }
}
