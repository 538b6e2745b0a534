//! Time sources for the countdown
//!
//! The countdown never reads the wall clock directly. It asks a `Clock`, so
//! tests and simulations can drive time by hand.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of "now" for deadline arithmetic.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock that follows the tokio runtime's time source.
///
/// Outside of a paused test runtime this is the wall clock. Under
/// `#[tokio::test(start_paused = true)]` it advances together with tokio's
/// timers, which keeps deadlines and poll intervals on the same timeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Manually advanced clock. Clones share the same current instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(origin: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(origin)),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Jump to an absolute instant (may move backwards).
    pub fn set(&self, to: Instant) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
