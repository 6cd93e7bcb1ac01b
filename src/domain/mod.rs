//! Domain layer - pure invocation logic with no external dependencies.
//!
//! This layer contains the core concepts of the limiter:
//! - Validated intervals
//! - Debounce and throttle policies
//! - The timestamp-driven state machines behind each policy
//!
//! Nothing here touches clocks, timers or threads.

pub mod interval;
pub mod policy;
