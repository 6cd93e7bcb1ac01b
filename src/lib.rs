//! # call-limiter
//!
//! Debounce and throttle adapters for callables.
//!
//! A [`Limiter`] wraps a function and controls how often it actually runs when
//! it is called in rapid bursts, such as keystrokes in a search box or scroll
//! events. Time and deferred execution come from injected collaborators, so
//! the same limiter runs on a Tokio runtime in production and on a manually
//! driven fake clock in tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use call_limiter::{Limiter, Policy};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Runs once, 300ms after the last keystroke
//!     let search = Limiter::create(
//!         |query: String| println!("searching for {query}"),
//!         300.0,
//!         Policy::debounce(),
//!     )
//!     .unwrap();
//!
//!     for query in ["r", "ru", "rus", "rust"] {
//!         search.call(query.to_string()).unwrap();
//!     }
//!     tokio::time::sleep(std::time::Duration::from_millis(400)).await;
//! }
//! ```
//!
//! ## Policies
//!
//! - **Debounce**: every call cancels the pending fire and schedules a new one
//!   `interval` later. The callable runs once per quiet period, with the
//!   arguments of the last call.
//! - **Throttle**: the callable runs immediately when at least `interval` has
//!   passed since it last ran; calls inside the window are dropped.
//! - **Throttle with trailing edge**: like throttle, but the latest dropped
//!   call is replayed when the window closes.
//!
//! ```rust,no_run
//! # use call_limiter::LimiterBuilder;
//! # use std::time::Duration;
//! # async fn example() {
//! let scroll = LimiterBuilder::throttle()
//!     .with_interval(Duration::from_millis(100))
//!     .with_trailing(true)
//!     .build(|offset: f64| println!("scrolled to {offset}"))
//!     .unwrap();
//! # }
//! ```
//!
//! Each call reports what it did through [`CallOutcome`].
//!
//! ## Errors
//!
//! Construction fails with [`BuildError::InvalidArgument`] for a negative or
//! non-finite interval. Calling a disposed limiter returns
//! [`LimiterError::Disposed`].
//!
//! A limiter never hands the callable's errors back to the caller: the
//! callable may run later on a timer, when nobody is waiting for it. Errors
//! returned by fallible callables and panics are caught and reported to a
//! [`FailureSink`]. The default sink logs them with `tracing::error!`.
//!
//! ## Disposal
//!
//! [`Limiter::dispose`] cancels any pending fire; no deferred call runs after
//! it returns. Dropping the last handle to a limiter cancels the pending fire
//! as well.
//!
//! ## Keyed Limiters
//!
//! [`LimiterRegistry`] holds one limiter per key, for event sources that come
//! and go at runtime:
//!
//! ```rust,no_run
//! # use call_limiter::LimiterBuilder;
//! # async fn example() {
//! let autosave = LimiterBuilder::debounce()
//!     .build_keyed(|document: &u64, contents: String| {
//!         println!("saving document {document}: {} bytes", contents.len())
//!     })
//!     .unwrap();
//!
//! autosave.call(1, "draft".to_string()).unwrap();
//! autosave.call(2, "notes".to_string()).unwrap();
//! # }
//! ```
//!
//! ## Observability
//!
//! Each limiter counts calls, fires and discarded calls:
//!
//! ```rust,no_run
//! # use call_limiter::{Limiter, Policy};
//! # let limiter = Limiter::create(|_: ()| {}, 100.0, Policy::throttle()).unwrap();
//! let snapshot = limiter.metrics().snapshot();
//! println!("calls: {}, fired: {}", snapshot.calls, snapshot.fired);
//! println!("discard rate: {:.2}%", snapshot.discard_rate() * 100.0);
//! ```
//!
//! ## Testing
//!
//! With the `test-helpers` feature, `infrastructure::mocks` provides a
//! `MockClock` and a `ManualScheduler` that only runs timers when the test
//! advances time:
//!
//! ```rust
//! # #[cfg(feature = "test-helpers")]
//! # {
//! use call_limiter::infrastructure::mocks::{ManualScheduler, MockClock};
//! use call_limiter::{CallOutcome, LimiterBuilder};
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! let clock = MockClock::new(Instant::now());
//! let scheduler = ManualScheduler::new(clock.clone());
//! let limiter = LimiterBuilder::throttle()
//!     .with_interval(Duration::from_millis(500))
//!     .with_clock(Arc::new(clock))
//!     .with_scheduler(Arc::new(scheduler.clone()))
//!     .build(|_: &str| {})
//!     .unwrap();
//!
//! assert_eq!(limiter.call("x1"), Ok(CallOutcome::Fired));
//! scheduler.advance(Duration::from_millis(100));
//! assert_eq!(limiter.call("x2"), Ok(CallOutcome::Dropped));
//! # }
//! ```
//!
//! ## Features
//!
//! - `async` (default): Tokio scheduler and clock, used by the builder's defaults
//! - `test-helpers`: mock clock, manual scheduler and recording sinks

/// Domain layer: intervals and policy state machines.
pub mod domain;

/// Application layer: limiter, registry, metrics and ports.
pub mod application;

/// Infrastructure layer: clocks, schedulers, sinks, storage and the builder.
pub mod infrastructure;

pub use domain::{
    interval::{Interval, IntervalError},
    policy::{
        CallDecision, DebounceState, InvocationPolicy, Policy, PolicyState, ThrottleState,
    },
};

pub use application::{
    limiter::{CallOutcome, Limiter, LimiterError, LimiterParts},
    metrics::{Metrics, MetricsSnapshot},
    ports::{
        BoxError, Clock, FailureCause, FailureSink, InvocationFailure, Scheduler, Storage, Task,
        TimerHandle, Trigger,
    },
    registry::{LimiterFactory, LimiterRegistry},
};

pub use infrastructure::{
    builder::{BuildError, KeyedLimiters, LimiterBuilder, DEFAULT_INTERVAL},
    clock::SystemClock,
    failure::TracingFailureSink,
    storage::ShardedStorage,
};

#[cfg(feature = "async")]
pub use infrastructure::{clock::TokioClock, scheduler::TokioScheduler};
