//! Failure sink adapters.

use crate::application::ports::{FailureCause, FailureSink, InvocationFailure};

/// Failure sink that logs through `tracing`.
///
/// Errors are logged at ERROR level with the policy, trigger and error as
/// fields. Installing a subscriber is up to the application.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureSink;

impl TracingFailureSink {
    /// Create a new tracing sink.
    pub fn new() -> Self {
        Self
    }
}

impl FailureSink for TracingFailureSink {
    fn report(&self, failure: InvocationFailure) {
        match &failure.cause {
            FailureCause::Error(error) => tracing::error!(
                policy = %failure.policy,
                trigger = %failure.trigger,
                error = %error,
                "rate-limited callable returned an error"
            ),
            FailureCause::Panic(message) => tracing::error!(
                policy = %failure.policy,
                trigger = %failure.trigger,
                panic = %message,
                "rate-limited callable panicked"
            ),
        }
    }
}
