//! Builder wiring limiters to their default collaborators.
//!
//! The application layer takes every collaborator explicitly through
//! `LimiterParts`. The builder fills in what the caller leaves out: the
//! Tokio scheduler of the current runtime, a matching clock, a tracing
//! failure sink and fresh metrics.

use crate::application::limiter::{Limiter, LimiterParts};
use crate::application::metrics::Metrics;
use crate::application::ports::{BoxError, Clock, FailureSink, Scheduler};
use crate::application::registry::{LimiterFactory, LimiterRegistry};
use crate::domain::interval::{Interval, IntervalError};
use crate::domain::policy::Policy;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::failure::TracingFailureSink;
use crate::infrastructure::storage::ShardedStorage;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "async")]
use crate::infrastructure::{clock::TokioClock, scheduler::TokioScheduler};

/// Interval used when none is configured.
pub const DEFAULT_INTERVAL: Interval = Interval::new(Duration::from_millis(300));

/// Registry type produced by `LimiterBuilder::build_keyed`.
pub type KeyedLimiters<K, A> = LimiterRegistry<K, A, Arc<ShardedStorage<K, Limiter<A>>>>;

/// Error returned when building a limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildError {
    /// The interval is negative, not finite or too large
    InvalidArgument(IntervalError),
    /// No scheduler was given and no Tokio runtime is running
    NoScheduler,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::InvalidArgument(e) => write!(f, "invalid argument: {}", e),
            BuildError::NoScheduler => write!(
                f,
                "no scheduler configured and no Tokio runtime available for the default one"
            ),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::InvalidArgument(e) => Some(e),
            BuildError::NoScheduler => None,
        }
    }
}

impl From<IntervalError> for BuildError {
    fn from(e: IntervalError) -> Self {
        BuildError::InvalidArgument(e)
    }
}

/// Builder for constructing a `Limiter` or a keyed registry of limiters.
///
/// # Examples
///
/// ```
/// use call_limiter::{CallOutcome, LimiterBuilder, Policy};
/// use call_limiter::infrastructure::mocks::{ManualScheduler, MockClock};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let clock = MockClock::new(Instant::now());
/// let scheduler = ManualScheduler::new(clock.clone());
///
/// let limiter = LimiterBuilder::new(Policy::debounce())
///     .with_interval(Duration::from_millis(300))
///     .with_clock(Arc::new(clock))
///     .with_scheduler(Arc::new(scheduler.clone()))
///     .build(|query: String| println!("searching for {}", query))
///     .unwrap();
///
/// assert_eq!(limiter.call("ru".to_string()), Ok(CallOutcome::Scheduled));
/// assert_eq!(limiter.call("rust".to_string()), Ok(CallOutcome::Scheduled));
/// scheduler.advance(Duration::from_millis(300));
/// assert!(!limiter.is_pending());
/// ```
pub struct LimiterBuilder {
    policy: Policy,
    interval: Result<Interval, IntervalError>,
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    failure_sink: Option<Arc<dyn FailureSink>>,
    metrics: Option<Metrics>,
}

impl LimiterBuilder {
    /// Start building a limiter with the given policy.
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            interval: Ok(DEFAULT_INTERVAL),
            clock: None,
            scheduler: None,
            failure_sink: None,
            metrics: None,
        }
    }

    /// Start building a debouncing limiter.
    pub fn debounce() -> Self {
        Self::new(Policy::debounce())
    }

    /// Start building a throttling limiter without a trailing edge.
    pub fn throttle() -> Self {
        Self::new(Policy::throttle())
    }

    /// Set the interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Ok(Interval::new(interval));
        self
    }

    /// Set the interval in milliseconds.
    ///
    /// Negative or non-finite values make `build` fail with
    /// `BuildError::InvalidArgument`.
    pub fn with_interval_millis(mut self, millis: f64) -> Self {
        self.interval = Interval::from_millis_f64(millis);
        self
    }

    /// Enable or disable the trailing-edge fire of a throttle.
    ///
    /// Has no effect on a debounce, which always fires on the trailing edge.
    pub fn with_trailing(mut self, trailing: bool) -> Self {
        if let Policy::Throttle { .. } = self.policy {
            self.policy = Policy::Throttle { trailing };
        }
        self
    }

    /// Set a custom clock.
    ///
    /// Must read the same time base the scheduler sleeps on.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set a custom scheduler.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Set where callable failures are reported. Defaults to `TracingFailureSink`.
    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    /// Share existing metrics instead of creating fresh ones.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build a limiter around an infallible callable.
    ///
    /// # Errors
    /// Returns `BuildError` if the interval is invalid or no scheduler is available.
    pub fn build<A, F>(self, callable: F) -> Result<Limiter<A>, BuildError>
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        let (policy, interval, parts) = self.resolve()?;
        Ok(Limiter::new(callable, interval, policy, parts))
    }

    /// Build a limiter around a fallible callable.
    ///
    /// # Errors
    /// Returns `BuildError` if the interval is invalid or no scheduler is available.
    pub fn try_build<A, F, E>(self, callable: F) -> Result<Limiter<A>, BuildError>
    where
        A: Send + 'static,
        F: Fn(A) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let (policy, interval, parts) = self.resolve()?;
        Ok(Limiter::new_fallible(callable, interval, policy, parts))
    }

    /// Build a registry holding one limiter per key.
    ///
    /// Each key gets its own limiter with this builder's settings, created
    /// on first call. The callable receives the key alongside the arguments.
    /// All limiters share one set of metrics.
    ///
    /// # Errors
    /// Returns `BuildError` if the interval is invalid or no scheduler is available.
    pub fn build_keyed<K, A, F>(self, callable: F) -> Result<KeyedLimiters<K, A>, BuildError>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        A: Send + 'static,
        F: Fn(&K, A) + Send + Sync + 'static,
    {
        let (policy, interval, parts) = self.resolve()?;
        let clock = Arc::clone(&parts.clock);
        let callable = Arc::new(callable);

        let factory: LimiterFactory<K, A> = Arc::new(move |key: &K| -> Limiter<A> {
            let key = key.clone();
            let callable = Arc::clone(&callable);
            Limiter::new(
                move |args: A| callable(&key, args),
                interval,
                policy,
                parts.clone(),
            )
        });

        Ok(LimiterRegistry::new(
            Arc::new(ShardedStorage::new()),
            clock,
            factory,
        ))
    }

    fn resolve(self) -> Result<(Policy, Interval, LimiterParts), BuildError> {
        // Interval first: a bad argument is reported even without a runtime
        let interval = self.interval?;

        let (default_clock, scheduler) = match self.scheduler {
            Some(scheduler) => (None, scheduler),
            None => {
                let (clock, scheduler) = runtime_defaults().ok_or(BuildError::NoScheduler)?;
                (Some(clock), scheduler)
            }
        };

        let clock = self
            .clock
            .or(default_clock)
            .unwrap_or_else(|| Arc::new(SystemClock::new()));

        let parts = LimiterParts {
            clock,
            scheduler,
            failure_sink: self
                .failure_sink
                .unwrap_or_else(|| Arc::new(TracingFailureSink::new())),
            metrics: self.metrics.unwrap_or_default(),
        };

        tracing::debug!(policy = %self.policy, %interval, "limiter configured");
        Ok((self.policy, interval, parts))
    }
}

impl fmt::Debug for LimiterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimiterBuilder")
            .field("policy", &self.policy)
            .field("interval", &self.interval)
            .field("custom_clock", &self.clock.is_some())
            .field("custom_scheduler", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "async")]
fn runtime_defaults() -> Option<(Arc<dyn Clock>, Arc<dyn Scheduler>)> {
    let scheduler = TokioScheduler::try_current()?;
    Some((Arc::new(TokioClock::new()), Arc::new(scheduler)))
}

#[cfg(not(feature = "async"))]
fn runtime_defaults() -> Option<(Arc<dyn Clock>, Arc<dyn Scheduler>)> {
    None
}

impl<A> Limiter<A>
where
    A: Send + 'static,
{
    /// Create a limiter with default collaborators.
    ///
    /// Shorthand for `LimiterBuilder::new(policy).with_interval_millis(interval_ms).build(callable)`.
    /// Must run inside a Tokio runtime, which provides the scheduler.
    ///
    /// # Errors
    /// Returns `BuildError::InvalidArgument` if `interval_ms` is negative or
    /// not finite, and `BuildError::NoScheduler` outside a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```
    /// use call_limiter::{BuildError, Limiter, Policy};
    ///
    /// let result = Limiter::create(|_: ()| {}, -5.0, Policy::debounce());
    /// assert!(matches!(result, Err(BuildError::InvalidArgument(_))));
    /// ```
    pub fn create<F>(callable: F, interval_ms: f64, policy: Policy) -> Result<Self, BuildError>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        LimiterBuilder::new(policy)
            .with_interval_millis(interval_ms)
            .build(callable)
    }
}
