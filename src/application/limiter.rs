//! Rate-limited invocation adapter.
//!
//! A `Limiter` wraps a callable and enforces a debounce or throttle policy on
//! it. The limiter drives the policy's state machine with an injected clock,
//! defers fires through an injected scheduler and reports callable failures
//! to an injected sink.

use crate::application::metrics::Metrics;
use crate::application::ports::{
    BoxError, Clock, FailureCause, FailureSink, InvocationFailure, Scheduler, TimerHandle, Trigger,
};
use crate::domain::interval::Interval;
use crate::domain::policy::{CallDecision, InvocationPolicy, Policy, PolicyState};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Error returned when calling a limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterError {
    /// The limiter was disposed and accepts no more calls
    Disposed,
}

impl fmt::Display for LimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimiterError::Disposed => write!(f, "limiter has been disposed"),
        }
    }
}

impl std::error::Error for LimiterError {}

/// What a call to the limiter did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The callable ran synchronously with this call's arguments
    Fired,
    /// A deferred fire is pending and will use this call's arguments
    Scheduled,
    /// The call was dropped
    Dropped,
}

impl CallOutcome {
    /// Check if the callable ran during the call.
    pub fn is_fired(&self) -> bool {
        matches!(self, CallOutcome::Fired)
    }

    /// Check if a deferred fire is pending.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, CallOutcome::Scheduled)
    }

    /// Check if the call was dropped.
    pub fn is_dropped(&self) -> bool {
        matches!(self, CallOutcome::Dropped)
    }
}

/// Host collaborators a limiter runs against.
#[derive(Debug, Clone)]
pub struct LimiterParts {
    /// Monotonic time source
    pub clock: Arc<dyn Clock>,
    /// Deferred execution facility
    pub scheduler: Arc<dyn Scheduler>,
    /// Receives failures of the callable
    pub failure_sink: Arc<dyn FailureSink>,
    /// Counters updated by the limiter
    pub metrics: Metrics,
}

type Callable<A> = Arc<dyn Fn(A) -> Result<(), BoxError> + Send + Sync>;

/// Wraps a callable with a debounce or throttle policy.
///
/// `Limiter` is a cheap handle: clones share the same state, so it can be
/// handed to several event sources that should be limited together. When the
/// last handle is dropped any pending fire is cancelled.
///
/// The argument type `A` is whatever the callable takes; use a tuple for
/// several arguments.
///
/// # Concurrency
///
/// All mutable state sits behind one lock, so a firing timer never races an
/// incoming call. Deferred and flushed fires are additionally serialized, so
/// two of them never overlap.
///
/// A leading-edge throttle fire runs on the caller's thread and does not wait
/// for that serialization. If a trailing fire's callable runs longer than the
/// interval, the next window's leading fire can start while it is still
/// running. The callable may call its own limiter; it must not `flush` it.
pub struct Limiter<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    callable: Callable<A>,
    policy: Policy,
    interval: Interval,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    failure_sink: Arc<dyn FailureSink>,
    metrics: Metrics,
    state: Mutex<State<A>>,
    firing: Mutex<()>,
}

struct State<A> {
    machine: PolicyState,
    pending: Option<Pending<A>>,
    generation: u64,
    last_call: Option<Instant>,
    disposed: bool,
}

struct Pending<A> {
    generation: u64,
    args: A,
    timer: Box<dyn TimerHandle>,
}

impl<A> Limiter<A>
where
    A: Send + 'static,
{
    /// Create a limiter around an infallible callable.
    pub fn new<F>(callable: F, interval: Interval, policy: Policy, parts: LimiterParts) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::from_callable(
            Arc::new(move |args: A| -> Result<(), BoxError> {
                callable(args);
                Ok(())
            }),
            interval,
            policy,
            parts,
        )
    }

    /// Create a limiter around a fallible callable.
    ///
    /// Errors returned by the callable go to the failure sink.
    pub fn new_fallible<F, E>(
        callable: F,
        interval: Interval,
        policy: Policy,
        parts: LimiterParts,
    ) -> Self
    where
        F: Fn(A) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::from_callable(
            Arc::new(move |args: A| -> Result<(), BoxError> {
                callable(args).map_err(Into::into)
            }),
            interval,
            policy,
            parts,
        )
    }

    fn from_callable(
        callable: Callable<A>,
        interval: Interval,
        policy: Policy,
        parts: LimiterParts,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                callable,
                policy,
                interval,
                clock: parts.clock,
                scheduler: parts.scheduler,
                failure_sink: parts.failure_sink,
                metrics: parts.metrics,
                state: Mutex::new(State {
                    machine: policy.into_state(interval),
                    pending: None,
                    generation: 0,
                    last_call: None,
                    disposed: false,
                }),
                firing: Mutex::new(()),
            }),
        }
    }

    /// Invoke the wrapped function.
    ///
    /// Never fails because of the callable: its errors and panics go to the
    /// failure sink.
    ///
    /// # Errors
    /// Returns `LimiterError::Disposed` after `dispose` has been called.
    pub fn call(&self, args: A) -> Result<CallOutcome, LimiterError> {
        self.submit(args).map_err(|_| LimiterError::Disposed)
    }

    /// Like `call`, but hands the arguments back if the limiter is disposed.
    pub(crate) fn submit(&self, args: A) -> Result<CallOutcome, A> {
        let inner = &self.inner;
        let mut state = inner.lock_state();
        if state.disposed {
            return Err(args);
        }

        inner.metrics.record_call();
        let now = inner.clock.now();
        state.last_call = Some(now);

        match state.machine.register_call(now) {
            CallDecision::FireNow => {
                if let Some(stale) = state.pending.take() {
                    stale.timer.cancel();
                    inner.metrics.record_superseded();
                }
                drop(state);
                inner.invoke(args, Trigger::Immediate);
                Ok(CallOutcome::Fired)
            }
            CallDecision::Reschedule { delay } => {
                if let Some(previous) = state.pending.take() {
                    previous.timer.cancel();
                    inner.metrics.record_superseded();
                    tracing::trace!(policy = %inner.policy, "superseded pending fire");
                }
                Inner::schedule(inner, &mut state, delay, args);
                Ok(CallOutcome::Scheduled)
            }
            CallDecision::Coalesce => match state.pending.as_mut() {
                Some(pending) => {
                    pending.args = args;
                    inner.metrics.record_superseded();
                    Ok(CallOutcome::Scheduled)
                }
                None => {
                    // Machine and slot disagree; resync rather than lose the next window.
                    state.machine.cancel_pending();
                    inner.metrics.record_dropped();
                    Ok(CallOutcome::Dropped)
                }
            },
            CallDecision::Drop => {
                inner.metrics.record_dropped();
                Ok(CallOutcome::Dropped)
            }
        }
    }

    /// Run the pending deferred fire now instead of waiting for its timer.
    ///
    /// Returns `true` if the callable ran. Must not be called from inside the
    /// callable itself.
    pub fn flush(&self) -> bool {
        let inner = &self.inner;
        let _firing = inner.lock_firing();

        let args = {
            let mut state = inner.lock_state();
            if state.disposed {
                return false;
            }
            let Some(pending) = state.pending.take() else {
                return false;
            };
            pending.timer.cancel();
            state.machine.register_fire(inner.clock.now());
            pending.args
        };

        inner.invoke(args, Trigger::Flush);
        true
    }

    /// Discard the pending deferred fire without disposing the limiter.
    ///
    /// Returns `true` if a fire was pending.
    pub fn cancel(&self) -> bool {
        let inner = &self.inner;
        let mut state = inner.lock_state();
        match state.pending.take() {
            Some(pending) => {
                pending.timer.cancel();
                state.machine.cancel_pending();
                inner.metrics.record_cancelled();
                tracing::debug!(policy = %inner.policy, "pending fire cancelled");
                true
            }
            None => false,
        }
    }
}

impl<A> Limiter<A> {
    /// Dispose the limiter.
    ///
    /// Cancels any pending fire; every later call fails with
    /// `LimiterError::Disposed`. Returns `true` if this call performed the
    /// disposal, `false` if the limiter was already disposed.
    pub fn dispose(&self) -> bool {
        let mut state = self.inner.lock_state();
        if state.disposed {
            return false;
        }
        self.inner.dispose_locked(&mut state);
        true
    }

    /// Check if the limiter has been idle for at least `max_idle` as of `now`.
    ///
    /// Idle means not disposed, nothing pending, no call within `max_idle`
    /// and, for throttle, no open window. A throttle limiter whose window is
    /// still open remembers its last fire and is never idle.
    pub fn is_idle(&self, now: Instant, max_idle: Duration) -> bool {
        self.inner.lock_state().is_idle(now, max_idle, self.inner.interval)
    }

    /// Dispose the limiter if it is idle, checking and disposing under one lock.
    ///
    /// A concurrent `call` either lands first, keeping the limiter alive, or
    /// fails with `LimiterError::Disposed`. Returns `true` if the limiter was
    /// disposed by this call.
    pub fn dispose_if_idle(&self, now: Instant, max_idle: Duration) -> bool {
        let mut state = self.inner.lock_state();
        if !state.is_idle(now, max_idle, self.inner.interval) {
            return false;
        }
        self.inner.dispose_locked(&mut state);
        true
    }

    /// Check if a deferred fire is pending.
    pub fn is_pending(&self) -> bool {
        self.inner.lock_state().pending.is_some()
    }

    /// Check if the limiter has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.lock_state().disposed
    }

    /// When the callable last ran (throttle only).
    pub fn last_fire(&self) -> Option<Instant> {
        self.inner.lock_state().machine.last_fire()
    }

    /// When the limiter last accepted a call.
    pub fn last_call(&self) -> Option<Instant> {
        self.inner.lock_state().last_call
    }

    /// Get the policy.
    pub fn policy(&self) -> Policy {
        self.inner.policy
    }

    /// Get the interval.
    pub fn interval(&self) -> Interval {
        self.inner.interval
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Check if two handles share the same limiter.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl<A> State<A> {
    fn is_idle(&self, now: Instant, max_idle: Duration, interval: Interval) -> bool {
        if self.disposed || self.pending.is_some() {
            return false;
        }
        let quiet = self
            .last_call
            .map_or(true, |last| now.saturating_duration_since(last) >= max_idle);
        let window_closed = self.machine.last_fire().map_or(true, |fired| {
            interval
                .remaining_after(now.saturating_duration_since(fired))
                .is_zero()
        });
        quiet && window_closed
    }
}

impl<A> Clone for Limiter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Limiter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("Limiter")
            .field("policy", &self.inner.policy)
            .field("interval", &self.inner.interval)
            .field("pending", &state.pending.is_some())
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl<A> Inner<A> {
    fn lock_state(&self) -> MutexGuard<'_, State<A>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_firing(&self) -> MutexGuard<'_, ()> {
        self.firing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispose_locked(&self, state: &mut State<A>) {
        state.disposed = true;
        if let Some(pending) = state.pending.take() {
            pending.timer.cancel();
            self.metrics.record_cancelled();
        }
        state.machine.reset();

        tracing::debug!(policy = %self.policy, interval = %self.interval, "limiter disposed");
    }

    /// Run the callable, routing errors and panics to the failure sink.
    fn invoke(&self, args: A, trigger: Trigger) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.callable)(args)));
        self.metrics.record_fired();

        let cause = match result {
            Ok(Ok(())) => return,
            Ok(Err(error)) => FailureCause::Error(error),
            Err(payload) => FailureCause::Panic(panic_message(payload)),
        };

        self.metrics.record_failure();
        self.failure_sink.report(InvocationFailure {
            policy: self.policy,
            trigger,
            cause,
        });
    }
}

impl<A> Inner<A>
where
    A: Send + 'static,
{
    fn schedule(this: &Arc<Self>, state: &mut State<A>, delay: Duration, args: A) {
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        let weak: Weak<Self> = Arc::downgrade(this);

        let timer = this.scheduler.schedule_after(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire_deferred(generation);
                }
            }),
        );

        state.pending = Some(Pending {
            generation,
            args,
            timer,
        });
        tracing::trace!(policy = %this.policy, ?delay, generation, "fire scheduled");
    }

    /// Timer callback. Runs only if the pending slot still belongs to `generation`.
    fn fire_deferred(&self, generation: u64) {
        let _firing = self.lock_firing();

        let args = {
            let mut state = self.lock_state();
            if state.disposed {
                return;
            }
            match state.pending.take() {
                Some(pending) if pending.generation == generation => {
                    state.machine.register_fire(self.clock.now());
                    pending.args
                }
                other => {
                    state.pending = other;
                    return;
                }
            }
        };

        self.invoke(args, Trigger::Deferred);
    }
}

impl<A> Drop for Inner<A> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = state.pending.take() {
            pending.timer.cancel();
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
