//! Mock implementations for testing.
//!
//! Test doubles for the clock, scheduler and failure sink ports, plus a
//! tracing layer capturing log events. Together they let limiter behavior
//! be checked deterministically, without sleeping.

pub mod clock;
pub mod layer;
pub mod scheduler;
pub mod sink;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
pub use scheduler::{ManualScheduler, ManualTimerHandle};
pub use sink::{RecordedFailure, RecordingSink};
