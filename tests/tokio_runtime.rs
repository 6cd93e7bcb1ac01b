//! Integration tests running limiters on a Tokio runtime with the default collaborators.

#![cfg(feature = "async")]

use call_limiter::{BuildError, CallOutcome, Limiter, LimiterBuilder, Policy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

type Fires<T> = Arc<Mutex<Vec<(Duration, T)>>>;

fn recorder<T: Send + 'static>(start: Instant) -> (Fires<T>, impl Fn(T) + Send + Sync + 'static) {
    let fires: Fires<T> = Arc::new(Mutex::new(Vec::new()));
    let fires_clone = Arc::clone(&fires);
    let record = move |arg: T| {
        fires_clone.lock().unwrap().push((start.elapsed(), arg));
    };
    (fires, record)
}

#[tokio::test(start_paused = true)]
async fn test_debounce_scenario_on_paused_time() {
    let start = Instant::now();
    let (fires, record) = recorder(start);
    let limiter = Limiter::create(record, 300.0, Policy::debounce()).unwrap();

    limiter.call("a").unwrap();
    sleep(Duration::from_millis(100)).await;
    limiter.call("b").unwrap();
    sleep(Duration::from_millis(100)).await;
    limiter.call("c").unwrap();
    sleep(Duration::from_millis(50)).await;
    limiter.call("d").unwrap();

    sleep(Duration::from_millis(299)).await;
    assert!(fires.lock().unwrap().is_empty());

    sleep(Duration::from_millis(2)).await;
    assert_eq!(
        *fires.lock().unwrap(),
        vec![(Duration::from_millis(550), "d")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_throttle_scenario_on_paused_time() {
    let start = Instant::now();
    let (fires, record) = recorder(start);
    let limiter = Limiter::create(record, 500.0, Policy::throttle()).unwrap();

    let mut elapsed = 0;
    for (at, arg) in [(0, "x1"), (100, "x2"), (200, "x3"), (600, "x4"), (650, "x5")] {
        sleep(Duration::from_millis(at - elapsed)).await;
        elapsed = at;
        limiter.call(arg).unwrap();
    }
    sleep(Duration::from_secs(2)).await;

    assert_eq!(
        *fires.lock().unwrap(),
        vec![
            (Duration::from_millis(0), "x1"),
            (Duration::from_millis(600), "x4")
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_trailing_throttle_on_paused_time() {
    let start = Instant::now();
    let (fires, record) = recorder(start);
    let limiter = LimiterBuilder::throttle()
        .with_interval_millis(200.0)
        .with_trailing(true)
        .build(record)
        .unwrap();

    assert_eq!(limiter.call(1), Ok(CallOutcome::Fired));
    sleep(Duration::from_millis(50)).await;
    assert_eq!(limiter.call(2), Ok(CallOutcome::Scheduled));
    assert_eq!(limiter.call(3), Ok(CallOutcome::Scheduled));

    sleep(Duration::from_millis(500)).await;
    assert_eq!(
        *fires.lock().unwrap(),
        vec![
            (Duration::from_millis(0), 1),
            (Duration::from_millis(200), 3)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_debounce_fires_after_yield() {
    let start = Instant::now();
    let (fires, record) = recorder(start);
    let limiter = Limiter::create(record, 0.0, Policy::debounce()).unwrap();

    limiter.call(1).unwrap();
    limiter.call(2).unwrap();
    limiter.call(3).unwrap();
    assert!(fires.lock().unwrap().is_empty());

    sleep(Duration::from_millis(5)).await;
    let fires = fires.lock().unwrap();
    assert_eq!(fires.len(), 1);
    assert_eq!(fires[0].1, 3);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_before_timer() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = Arc::clone(&runs);
    let limiter = Limiter::create(
        move |_: ()| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        },
        100.0,
        Policy::debounce(),
    )
    .unwrap();

    limiter.call(()).unwrap();
    sleep(Duration::from_millis(50)).await;
    limiter.dispose();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_on_multi_thread_runtime() {
    let runs = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let runs_clone = Arc::clone(&runs);
    let last_clone = Arc::clone(&last);

    let limiter = LimiterBuilder::debounce()
        .with_interval(Duration::from_millis(200))
        .build(move |n: usize| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            *last_clone.lock().unwrap() = Some(n);
        })
        .unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|worker| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    limiter.call(worker * 100 + i).unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    sleep(Duration::from_millis(800)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(last.lock().unwrap().is_some());
    assert_eq!(limiter.metrics().calls(), 400);
}

#[test]
fn test_create_outside_runtime() {
    let result = Limiter::create(|_: u8| {}, 100.0, Policy::debounce());
    assert!(matches!(result, Err(BuildError::NoScheduler)));

    let result = Limiter::create(|_: u8| {}, -5.0, Policy::debounce());
    assert!(matches!(result, Err(BuildError::InvalidArgument(_))));
}

#[test]
fn test_explicit_runtime_handle() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = Arc::clone(&runs);

    // Built outside the runtime, on its handle
    let limiter = LimiterBuilder::debounce()
        .with_interval(Duration::from_millis(100))
        .with_scheduler(Arc::new(call_limiter::TokioScheduler::new(
            runtime.handle().clone(),
        )))
        .with_clock(Arc::new(call_limiter::TokioClock::new()))
        .build(move |_: u8| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    runtime.block_on(async {
        limiter.call(1).unwrap();
        sleep(Duration::from_millis(150)).await;
    });
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
