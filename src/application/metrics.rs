//! Observability metrics for limiters.
//!
//! Counts what happened to every call a limiter received.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking limiter statistics.
///
/// All counters are atomics shared behind an `Arc`: clones observe and update
/// the same values, so one `Metrics` can be handed to several limiters to get
/// aggregate numbers.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Calls accepted by the wrapped function
    calls: AtomicU64,
    /// Times the callable actually ran
    fired: AtomicU64,
    /// Calls dropped inside a throttle window
    dropped: AtomicU64,
    /// Calls whose arguments were replaced by a later call
    superseded: AtomicU64,
    /// Pending fires discarded by cancel or dispose
    cancelled: AtomicU64,
    /// Runs that returned an error or panicked
    failures: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_call(&self) {
        self.inner.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fired(&self) {
        self.inner.fired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_superseded(&self) {
        self.inner.superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.inner.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of calls received.
    pub fn calls(&self) -> u64 {
        self.inner.calls.load(Ordering::Relaxed)
    }

    /// Get the number of times the callable ran.
    pub fn fired(&self) -> u64 {
        self.inner.fired.load(Ordering::Relaxed)
    }

    /// Get the number of dropped calls.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Get the number of superseded calls.
    pub fn superseded(&self) -> u64 {
        self.inner.superseded.load(Ordering::Relaxed)
    }

    /// Get the number of cancelled pending fires.
    pub fn cancelled(&self) -> u64 {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Get the number of failed runs.
    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls(),
            fired: self.fired(),
            dropped: self.dropped(),
            superseded: self.superseded(),
            cancelled: self.cancelled(),
            failures: self.failures(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.calls.store(0, Ordering::Relaxed);
        self.inner.fired.store(0, Ordering::Relaxed);
        self.inner.dropped.store(0, Ordering::Relaxed);
        self.inner.superseded.store(0, Ordering::Relaxed);
        self.inner.cancelled.store(0, Ordering::Relaxed);
        self.inner.failures.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Calls received
    pub calls: u64,
    /// Times the callable ran
    pub fired: u64,
    /// Calls dropped inside a throttle window
    pub dropped: u64,
    /// Calls whose arguments were replaced by a later call
    pub superseded: u64,
    /// Pending fires discarded
    pub cancelled: u64,
    /// Failed runs
    pub failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of calls whose arguments never reached the callable (0.0 to 1.0).
    ///
    /// Returns 0.0 if no calls have been received.
    pub fn discard_rate(&self) -> f64 {
        if self.calls == 0 {
            return 0.0;
        }
        let discarded = self
            .dropped
            .saturating_add(self.superseded)
            .saturating_add(self.cancelled);
        discarded as f64 / self.calls as f64
    }
}
