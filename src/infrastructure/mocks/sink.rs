//! Recording failure sink for testing.

use crate::application::ports::{FailureCause, FailureSink, InvocationFailure, Trigger};
use crate::domain::policy::Policy;
use std::sync::{Arc, Mutex};

/// Failure sink that keeps every report for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    failures: Arc<Mutex<Vec<RecordedFailure>>>,
}

/// A failure captured by `RecordingSink`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RecordedFailure {
    /// Policy of the limiter whose callable failed
    pub policy: Policy,
    /// How the failing fire was started
    pub trigger: Trigger,
    /// Error message or panic payload
    pub message: String,
    /// Whether the callable panicked rather than returning an error
    pub panicked: bool,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded failures.
    pub fn failures(&self) -> Vec<RecordedFailure> {
        self.failures
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }
}

impl FailureSink for RecordingSink {
    fn report(&self, failure: InvocationFailure) {
        let (message, panicked) = match failure.cause {
            FailureCause::Error(error) => (error.to_string(), false),
            FailureCause::Panic(message) => (message, true),
        };

        self.failures
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .push(RecordedFailure {
                policy: failure.policy,
                trigger: failure.trigger,
                message,
                panicked,
            });
    }
}
