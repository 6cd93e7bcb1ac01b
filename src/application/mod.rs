//! Application layer - orchestration of domain logic.
//!
//! This layer drives the policy state machines against real collaborators:
//! - Limiter (call handling, deferred fires, disposal)
//! - Limiter registry (one limiter per key)
//! - Metrics (call and fire counters)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement: clock, scheduler, failure sink and storage.
//! This keeps the application layer independent from any runtime.

pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
