//! Integration tests for throttled limiters driven by a manual clock.

use call_limiter::infrastructure::mocks::{ManualScheduler, MockClock};
use call_limiter::{CallOutcome, Clock, Limiter, LimiterBuilder, Policy};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type Fires<T> = Arc<Mutex<Vec<(Duration, T)>>>;

struct Setup<T> {
    limiter: Limiter<T>,
    scheduler: ManualScheduler,
    fires: Fires<T>,
    elapsed: u64,
}

impl<T: Send + Clone + 'static> Setup<T> {
    fn new(millis: u64, policy: Policy) -> Self {
        let start = Instant::now();
        let clock = MockClock::new(start);
        let scheduler = ManualScheduler::new(clock.clone());
        let fires: Fires<T> = Arc::new(Mutex::new(Vec::new()));

        let fires_clone = Arc::clone(&fires);
        let clock_clone = clock.clone();
        let limiter = LimiterBuilder::new(policy)
            .with_interval(Duration::from_millis(millis))
            .with_clock(Arc::new(clock))
            .with_scheduler(Arc::new(scheduler.clone()))
            .build(move |arg: T| {
                fires_clone
                    .lock()
                    .unwrap()
                    .push((clock_clone.now() - start, arg));
            })
            .unwrap();

        Self {
            limiter,
            scheduler,
            fires,
            elapsed: 0,
        }
    }

    /// Move to `at` milliseconds after start, running due timers, then call.
    fn call_at(&mut self, at: u64, arg: T) -> CallOutcome {
        self.scheduler.advance(ms(at - self.elapsed));
        self.elapsed = at;
        self.limiter.call(arg).unwrap()
    }

    fn fires(&self) -> Vec<(Duration, T)> {
        self.fires.lock().unwrap().clone()
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn test_window_scenario() {
    let mut setup = Setup::new(500, Policy::throttle());

    let outcomes: Vec<_> = [(0, "x1"), (100, "x2"), (200, "x3"), (600, "x4"), (650, "x5")]
        .into_iter()
        .map(|(at, arg)| setup.call_at(at, arg))
        .collect();

    assert_eq!(
        outcomes,
        vec![
            CallOutcome::Fired,
            CallOutcome::Dropped,
            CallOutcome::Dropped,
            CallOutcome::Fired,
            CallOutcome::Dropped,
        ]
    );

    setup.scheduler.advance(ms(5_000));
    assert_eq!(setup.fires(), vec![(ms(0), "x1"), (ms(600), "x4")]);
}

#[test]
fn test_one_fire_per_window_with_first_args() {
    let mut setup = Setup::new(100, Policy::throttle());

    // A call every 30ms for one second
    for at in (0..1_000).step_by(30) {
        setup.call_at(at, at);
    }

    let fires = setup.fires();
    // Each window opens with the first call at or after the previous window's end
    let expected: Vec<_> = [0, 120, 240, 360, 480, 600, 720, 840, 960]
        .into_iter()
        .map(|at| (ms(at), at))
        .collect();
    assert_eq!(fires, expected);

    for pair in fires.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= ms(100));
    }
}

#[test]
fn test_elapsed_equal_to_interval_fires() {
    let mut setup = Setup::new(100, Policy::throttle());

    assert_eq!(setup.call_at(0, 1), CallOutcome::Fired);
    assert_eq!(setup.call_at(99, 2), CallOutcome::Dropped);
    assert_eq!(setup.call_at(100, 3), CallOutcome::Fired);
}

#[test]
fn test_same_timestamp_second_call_dropped() {
    let mut setup = Setup::new(100, Policy::throttle());

    assert_eq!(setup.call_at(0, "first"), CallOutcome::Fired);
    assert_eq!(setup.call_at(0, "second"), CallOutcome::Dropped);
    assert_eq!(setup.fires(), vec![(ms(0), "first")]);
}

#[test]
fn test_zero_interval_always_fires() {
    let mut setup = Setup::new(0, Policy::throttle());

    for i in 0..5 {
        assert_eq!(setup.call_at(0, i), CallOutcome::Fired);
    }
    assert_eq!(setup.fires().len(), 5);
    assert_eq!(setup.scheduler.pending(), 0);
}

#[test]
fn test_no_trailing_fire_by_default() {
    let mut setup = Setup::new(500, Policy::throttle());

    setup.call_at(0, "x1");
    setup.call_at(400, "x2");
    setup.scheduler.advance(ms(10_000));

    assert_eq!(setup.fires(), vec![(ms(0), "x1")]);
    assert!(!setup.limiter.is_pending());
}

#[test]
fn test_trailing_edge_replays_latest_dropped_call() {
    let mut setup = Setup::new(500, Policy::throttle_trailing());

    assert_eq!(setup.call_at(0, "x1"), CallOutcome::Fired);
    assert_eq!(setup.call_at(100, "x2"), CallOutcome::Scheduled);
    assert_eq!(setup.call_at(200, "x3"), CallOutcome::Scheduled);
    assert_eq!(setup.scheduler.pending(), 1);

    setup.scheduler.advance(ms(300));
    assert_eq!(setup.fires(), vec![(ms(0), "x1"), (ms(500), "x3")]);
}

#[test]
fn test_trailing_window_scenario() {
    let mut setup = Setup::new(500, Policy::throttle_trailing());

    for (at, arg) in [(0, "x1"), (100, "x2"), (200, "x3"), (600, "x4"), (650, "x5")] {
        setup.call_at(at, arg);
    }
    setup.scheduler.advance(ms(5_000));

    // x3 closes the first window at 500, which opens the next one: x4 and x5
    // fall inside it and x5 is replayed at 1000
    assert_eq!(
        setup.fires(),
        vec![(ms(0), "x1"), (ms(500), "x3"), (ms(1_000), "x5")]
    );
    assert_eq!(setup.limiter.metrics().snapshot().superseded, 2);
}

#[test]
fn test_trailing_fires_in_order() {
    let mut setup = Setup::new(100, Policy::throttle_trailing());

    for at in (0..500).step_by(10) {
        setup.call_at(at, at);
    }
    setup.scheduler.advance(ms(1_000));

    let fires = setup.fires();
    assert!(fires.windows(2).all(|pair| pair[0].0 < pair[1].0));
    assert!(fires.windows(2).all(|pair| pair[1].0 - pair[0].0 >= ms(100)));
    // The last call is never lost
    assert_eq!(fires.last().map(|(_, arg)| *arg), Some(490));
}

#[test]
fn test_cancel_trailing_fire() {
    let mut setup = Setup::new(500, Policy::throttle_trailing());

    setup.call_at(0, "x1");
    setup.call_at(100, "x2");
    assert!(setup.limiter.cancel());

    setup.scheduler.advance(ms(1_000));
    assert_eq!(setup.fires(), vec![(ms(0), "x1")]);
    assert_eq!(setup.limiter.metrics().cancelled(), 1);

    // The limiter keeps working after a cancel
    assert_eq!(setup.call_at(1_100, "x3"), CallOutcome::Fired);
}
