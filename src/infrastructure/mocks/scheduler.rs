//! Manually driven scheduler for testing.

use super::clock::MockClock;
use crate::application::ports::{Clock, Scheduler, Task, TimerHandle};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Scheduler whose timers only run when the test advances time.
///
/// Timers are due at `clock.now() + delay` when scheduled. `advance` moves
/// the shared `MockClock` forward and runs due timers in due order, setting
/// the clock to each timer's due instant before running it, so callables
/// observe the exact time they would fire at in production.
///
/// # Examples
///
/// ```
/// use call_limiter::infrastructure::mocks::{ManualScheduler, MockClock};
/// use call_limiter::Scheduler;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let clock = MockClock::new(Instant::now());
/// let scheduler = ManualScheduler::new(clock);
/// let runs = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&runs);
/// scheduler.schedule_after(Duration::from_millis(100), Box::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// assert_eq!(scheduler.advance(Duration::from_millis(99)), 0);
/// assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct ManualScheduler {
    clock: MockClock,
    queue: Arc<Mutex<Queue>>,
}

#[derive(Default)]
struct Queue {
    next_seq: u64,
    entries: Vec<Entry>,
}

struct Entry {
    due: Instant,
    seq: u64,
    task: Task,
    cancelled: Arc<AtomicBool>,
}

impl ManualScheduler {
    /// Create a scheduler driven by `clock`.
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            queue: Arc::new(Mutex::new(Queue::default())),
        }
    }

    /// Get the clock this scheduler drives.
    pub fn clock(&self) -> &MockClock {
        &self.clock
    }

    /// Advance time by `duration`, running every timer that falls due.
    ///
    /// Returns how many timers ran.
    pub fn advance(&self, duration: Duration) -> usize {
        let target = self.clock.now() + duration;
        self.advance_to(target)
    }

    /// Advance time to `target`, running every timer due at or before it.
    ///
    /// Timers scheduled by running timers are run too if they fall due in
    /// time. Returns how many timers ran.
    pub fn advance_to(&self, target: Instant) -> usize {
        let mut ran = 0;
        while let Some(entry) = self.pop_due(target) {
            if entry.due > self.clock.now() {
                self.clock.set(entry.due);
            }
            (entry.task)();
            ran += 1;
        }
        if target > self.clock.now() {
            self.clock.set(target);
        }
        ran
    }

    /// Run timers already due without moving time.
    pub fn run_due(&self) -> usize {
        self.advance_to(self.clock.now())
    }

    /// Number of timers scheduled and not yet run or cancelled.
    pub fn pending(&self) -> usize {
        self.lock_queue()
            .entries
            .iter()
            .filter(|entry| !entry.cancelled.load(Ordering::SeqCst))
            .count()
    }

    fn pop_due(&self, target: Instant) -> Option<Entry> {
        let mut queue = self.lock_queue();
        queue
            .entries
            .retain(|entry| !entry.cancelled.load(Ordering::SeqCst));

        let index = queue
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= target)
            .min_by_key(|(_, entry)| (entry.due, entry.seq))
            .map(|(index, _)| index)?;

        Some(queue.entries.swap_remove(index))
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.queue
            .lock()
            .expect("ManualScheduler mutex poisoned - a test thread panicked while holding the lock")
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, task: Task) -> Box<dyn TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut queue = self.lock_queue();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.entries.push(Entry {
            due: self.clock.now() + delay,
            seq,
            task,
            cancelled: Arc::clone(&cancelled),
        });

        Box::new(ManualTimerHandle { cancelled })
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.clock.now())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Handle to a timer queued on a `ManualScheduler`.
#[derive(Debug)]
pub struct ManualTimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle for ManualTimerHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
