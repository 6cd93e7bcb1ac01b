//! Ports (interfaces) for the application layer.
//!
//! The limiter needs three things from its host: a monotonic clock, a way to
//! run a task after a delay, and a channel for failures of the wrapped
//! callable that happen after the caller has returned. Infrastructure
//! adapters implement these ports.

use crate::domain::policy::Policy;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Boxed error type returned by fallible callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Deferred unit of work handed to a `Scheduler`.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Port for obtaining current time.
///
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Handle to a task scheduled with a `Scheduler`.
pub trait TimerHandle: Send + Sync + Debug {
    /// Cancel the task.
    ///
    /// Cancelling a task that already ran, or is running, has no effect on
    /// that run. Cancelling twice is a no-op.
    fn cancel(&self);
}

/// Port for deferred execution.
///
/// Implementations must never run `task` before `schedule_after` returns:
/// the limiter holds its state lock while scheduling.
pub trait Scheduler: Send + Sync + Debug {
    /// Run `task` once `delay` has elapsed.
    fn schedule_after(&self, delay: Duration, task: Task) -> Box<dyn TimerHandle>;
}

/// What caused the callable to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Ran synchronously inside `call` (throttle leading edge)
    Immediate,
    /// Ran from a scheduled timer
    Deferred,
    /// Ran from an explicit `flush`
    Flush,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Immediate => write!(f, "immediate"),
            Trigger::Deferred => write!(f, "deferred"),
            Trigger::Flush => write!(f, "flush"),
        }
    }
}

/// Why a callable invocation failed.
#[derive(Debug)]
pub enum FailureCause {
    /// The callable returned an error
    Error(BoxError),
    /// The callable panicked; holds the panic message
    Panic(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Error(e) => write!(f, "{}", e),
            FailureCause::Panic(message) => write!(f, "panicked: {}", message),
        }
    }
}

/// A failed invocation of the wrapped callable.
#[derive(Debug)]
pub struct InvocationFailure {
    /// Policy of the limiter that ran the callable
    pub policy: Policy,
    /// What caused the run
    pub trigger: Trigger,
    /// The failure itself
    pub cause: FailureCause,
}

impl fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} callable failed ({} run): {}",
            self.policy, self.trigger, self.cause
        )
    }
}

impl std::error::Error for InvocationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            FailureCause::Error(e) => Some(e.as_ref()),
            FailureCause::Panic(_) => None,
        }
    }
}

/// Port receiving failures of the wrapped callable.
///
/// This is the asynchronous error channel: by the time a deferred invocation
/// fails there is no caller left to return the error to.
pub trait FailureSink: Send + Sync + Debug {
    /// Report a failed invocation.
    fn report(&self, failure: InvocationFailure);
}

/// Port for concurrent key-value storage of limiters.
///
/// Infrastructure provides concrete implementations (ShardedStorage).
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Get the value for `key`, creating it with `factory` if missing.
    fn get_or_insert_with(&self, key: K, factory: impl FnOnce(&K) -> V) -> V;

    /// Get a clone of the value for `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Remove the value for `key`, returning it.
    fn remove(&self, key: &K) -> Option<V>;

    /// Remove the value for `key` only if `predicate` accepts it.
    fn remove_if(&self, key: &K, predicate: impl FnOnce(&V) -> bool) -> Option<V>;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clone out every value.
    fn values(&self) -> Vec<V>;

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool;
}
