//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system, Tokio or mock time)
//! - Scheduling deferred fires on a Tokio runtime
//! - Reporting callable failures through `tracing`
//! - Storage implementations (sharded maps)
//! - The builder wiring these defaults together

pub mod builder;
pub mod clock;
pub mod failure;
#[cfg(feature = "async")]
pub mod scheduler;
pub mod storage;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides a controllable clock, a manually driven
/// scheduler and a recording failure sink.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// call-limiter = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
