//! Time sources for benchmark measurements

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Milliseconds elapsed since `start`
    fn elapsed_ms(&self, start: Instant) -> f64 {
        self.now().saturating_duration_since(start).as_secs_f64() * 1000.0
    }
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock that advances by a fixed step on every reading
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    step_micros: u64,
    ticks: AtomicU64,
}

impl ManualClock {
    pub fn new(step: Duration) -> Self {
        Self {
            origin: Instant::now(),
            step_micros: step.as_micros() as u64,
            ticks: AtomicU64::new(0),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.origin + Duration::from_micros(tick * self.step_micros)
    }
}
