use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock source, injected rather than read from `SystemTime::now()`
/// directly so timeline and availability-window tests are deterministic.
pub trait Clock: Send + Sync {
    /// Wall-clock time in seconds since the Unix epoch.
    fn now_seconds(&self) -> f64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the Unix epoch")
            .as_secs_f64()
    }
}

/// A settable clock for deterministic tests. Stores seconds as fixed-point
/// milliseconds in an `AtomicU64` so the clock can be shared across threads
/// without a lock.
#[derive(Debug)]
pub struct TestClock {
    millis: AtomicU64,
}

impl TestClock {
    pub fn new(start_seconds: f64) -> Self {
        Self {
            millis: AtomicU64::new((start_seconds * 1000.0) as u64),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.millis.store((seconds * 1000.0) as u64, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_seconds: f64) {
        self.millis
            .fetch_add((delta_seconds * 1000.0) as u64, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_seconds(&self) -> f64 {
        self.millis.load(Ordering::SeqCst) as f64 / 1000.0
    }
}
