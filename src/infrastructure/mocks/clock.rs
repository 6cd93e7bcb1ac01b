//! Hand-driven clock for limiter tests.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Clock that only moves when a test moves it.
///
/// Limiters read `now()` on every call and every fire, so a test can walk a
/// debounce or throttle window millisecond by millisecond. Clones share one
/// instant; `ManualScheduler` holds a clone and moves it as timers fall due.
///
/// # Examples
///
/// ```
/// use call_limiter::infrastructure::mocks::MockClock;
/// use call_limiter::{Clock, Interval};
/// use std::time::Instant;
///
/// let opened = Instant::now();
/// let clock = MockClock::new(opened);
/// let window = Interval::from_millis(500);
///
/// clock.advance(window.as_duration());
/// assert_eq!(clock.now().duration_since(opened), window.as_duration());
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Start the clock at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    /// Jump to `instant`.
    ///
    /// Unlike a real monotonic clock this may move backwards; limiters
    /// saturate negative elapsed time to zero.
    pub fn set(&self, instant: Instant) {
        *self.lock() = instant;
    }

    fn lock(&self) -> MutexGuard<'_, Instant> {
        self.now
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.lock()
    }
}
