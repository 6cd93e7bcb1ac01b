//! Integration tests for debounced limiters driven by a manual clock.

use call_limiter::infrastructure::mocks::{ManualScheduler, MockClock};
use call_limiter::{CallOutcome, Limiter, LimiterBuilder, Policy};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type Fires<T> = Arc<Mutex<Vec<(Duration, T)>>>;

/// Builds a debounced limiter recording the time and argument of every fire.
fn debounced<T: Send + 'static>(millis: u64) -> (Limiter<T>, ManualScheduler, Fires<T>) {
    let start = Instant::now();
    let clock = MockClock::new(start);
    let scheduler = ManualScheduler::new(clock.clone());
    let fires: Fires<T> = Arc::new(Mutex::new(Vec::new()));

    let fires_clone = Arc::clone(&fires);
    let clock_clone = clock.clone();
    let limiter = LimiterBuilder::new(Policy::debounce())
        .with_interval(Duration::from_millis(millis))
        .with_clock(Arc::new(clock))
        .with_scheduler(Arc::new(scheduler.clone()))
        .build(move |arg: T| {
            use call_limiter::Clock;
            fires_clone
                .lock()
                .unwrap()
                .push((clock_clone.now() - start, arg));
        })
        .unwrap();

    (limiter, scheduler, fires)
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn test_search_box_burst() {
    let (limiter, scheduler, fires) = debounced(300);

    // Keystrokes at t=0, 100, 200, 250
    limiter.call("a").unwrap();
    scheduler.advance(ms(100));
    limiter.call("b").unwrap();
    scheduler.advance(ms(100));
    limiter.call("c").unwrap();
    scheduler.advance(ms(50));
    limiter.call("d").unwrap();

    scheduler.advance(ms(2_000));

    assert_eq!(*fires.lock().unwrap(), vec![(ms(550), "d")]);
}

#[test]
fn test_burst_fires_once_with_last_args() {
    for calls in [1_u64, 2, 5, 20] {
        for spacing in [0_u64, 1, 50, 99] {
            let (limiter, scheduler, fires) = debounced(100);

            for i in 0..calls {
                if i > 0 {
                    scheduler.advance(ms(spacing));
                }
                assert_eq!(limiter.call(i), Ok(CallOutcome::Scheduled));
            }
            let last_call_at = spacing * (calls - 1);

            scheduler.advance(ms(99));
            assert!(
                fires.lock().unwrap().is_empty(),
                "{} calls spaced {}ms fired early",
                calls,
                spacing
            );

            scheduler.advance(ms(1_000));
            assert_eq!(
                *fires.lock().unwrap(),
                vec![(ms(last_call_at + 100), calls - 1)],
                "{} calls spaced {}ms",
                calls,
                spacing
            );
        }
    }
}

#[test]
fn test_calls_spaced_beyond_interval_fire_each() {
    let (limiter, scheduler, fires) = debounced(100);

    for i in 0..3 {
        limiter.call(i).unwrap();
        scheduler.advance(ms(150));
    }

    assert_eq!(
        *fires.lock().unwrap(),
        vec![(ms(100), 0), (ms(250), 1), (ms(400), 2)]
    );
}

#[test]
fn test_same_timestamp_resets_timer() {
    let (limiter, scheduler, fires) = debounced(100);

    limiter.call("first").unwrap();
    limiter.call("second").unwrap();
    assert_eq!(scheduler.pending(), 1);

    scheduler.advance(ms(100));
    assert_eq!(*fires.lock().unwrap(), vec![(ms(100), "second")]);
}

#[test]
fn test_zero_interval_fires_on_next_tick() {
    let (limiter, scheduler, fires) = debounced(0);

    for arg in ["a", "b", "c"] {
        assert_eq!(limiter.call(arg), Ok(CallOutcome::Scheduled));
    }
    // Nothing runs synchronously, even with a zero interval
    assert!(fires.lock().unwrap().is_empty());

    assert_eq!(scheduler.run_due(), 1);
    assert_eq!(*fires.lock().unwrap(), vec![(ms(0), "c")]);
}

#[test]
fn test_flush_runs_latest_args_early() {
    let (limiter, scheduler, fires) = debounced(300);

    limiter.call("draft 1").unwrap();
    scheduler.advance(ms(50));
    limiter.call("draft 2").unwrap();

    assert!(limiter.flush());
    assert!(!limiter.is_pending());
    assert_eq!(*fires.lock().unwrap(), vec![(ms(50), "draft 2")]);

    scheduler.advance(ms(1_000));
    assert_eq!(fires.lock().unwrap().len(), 1);
}

#[test]
fn test_metrics_count_superseded_calls() {
    let (limiter, scheduler, _fires) = debounced(100);

    for i in 0..10 {
        limiter.call(i).unwrap();
    }
    scheduler.advance(ms(100));

    let snapshot = limiter.metrics().snapshot();
    assert_eq!(snapshot.calls, 10);
    assert_eq!(snapshot.fired, 1);
    assert_eq!(snapshot.superseded, 9);
    assert_eq!(snapshot.dropped, 0);
    assert!((snapshot.discard_rate() - 0.9).abs() < f64::EPSILON);
}
