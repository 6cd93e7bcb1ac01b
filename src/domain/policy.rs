//! Invocation policies.
//!
//! This module defines the two policies a limiter can enforce and the pure
//! state machines behind them. The state machines see only timestamps; the
//! application layer owns the timers and the callable.

use crate::domain::interval::Interval;
use std::fmt;
use std::time::{Duration, Instant};

/// How a limiter decides when the wrapped callable runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Fire once after calls have been quiet for the whole interval
    Debounce,
    /// Fire at most once per interval window
    Throttle {
        /// Fire once more at the end of a window that dropped calls
        trailing: bool,
    },
}

impl Policy {
    /// Debounce policy.
    pub const fn debounce() -> Self {
        Policy::Debounce
    }

    /// Leading-edge throttle: calls inside a window are dropped.
    pub const fn throttle() -> Self {
        Policy::Throttle { trailing: false }
    }

    /// Throttle that also fires at the end of a window with the latest dropped arguments.
    pub const fn throttle_trailing() -> Self {
        Policy::Throttle { trailing: true }
    }

    /// Check if this is the debounce policy.
    pub fn is_debounce(&self) -> bool {
        matches!(self, Policy::Debounce)
    }

    /// Check if this is a throttle policy.
    pub fn is_throttle(&self) -> bool {
        matches!(self, Policy::Throttle { .. })
    }

    /// Whether a deferred trailing fire is enabled.
    pub fn trailing(&self) -> bool {
        matches!(self, Policy::Throttle { trailing: true })
    }

    /// Build the decision state machine for this policy.
    pub fn into_state(self, interval: Interval) -> PolicyState {
        match self {
            Policy::Debounce => PolicyState::Debounce(DebounceState::new(interval)),
            Policy::Throttle { trailing } => {
                PolicyState::Throttle(ThrottleState::new(interval, trailing))
            }
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Debounce => write!(f, "debounce"),
            Policy::Throttle { trailing: false } => write!(f, "throttle"),
            Policy::Throttle { trailing: true } => write!(f, "throttle+trailing"),
        }
    }
}

/// Decision made by a policy for one incoming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDecision {
    /// Run the callable right away with this call's arguments.
    ///
    /// Any deferred fire still pending is discarded.
    FireNow,
    /// Replace any pending deferred fire with one due after `delay`
    Reschedule {
        /// Delay until the deferred fire
        delay: Duration,
    },
    /// Keep the pending deferred fire but give it this call's arguments
    Coalesce,
    /// Drop the call
    Drop,
}

impl CallDecision {
    /// Check if the callable runs synchronously for this call.
    pub fn is_fire_now(&self) -> bool {
        matches!(self, CallDecision::FireNow)
    }

    /// Check if the call was dropped.
    pub fn is_drop(&self) -> bool {
        matches!(self, CallDecision::Drop)
    }
}

/// Trait implemented by policy state machines.
pub trait InvocationPolicy: Send + Sync {
    /// Register an incoming call at `now` and decide what to do with it.
    fn register_call(&mut self, now: Instant) -> CallDecision;

    /// Record that a deferred fire ran at `now`.
    fn register_fire(&mut self, now: Instant);

    /// Record that the pending deferred fire was discarded without running.
    fn cancel_pending(&mut self);

    /// Forget all history.
    fn reset(&mut self);
}

/// Debounce state machine.
///
/// Every call pushes the deferred fire a full interval into the future, so
/// there is no state beyond the interval itself.
///
/// # Example
/// ```
/// use call_limiter::{CallDecision, DebounceState, Interval, InvocationPolicy};
/// use std::time::{Duration, Instant};
///
/// let mut state = DebounceState::new(Interval::from_millis(300));
/// let now = Instant::now();
///
/// assert_eq!(
///     state.register_call(now),
///     CallDecision::Reschedule { delay: Duration::from_millis(300) }
/// );
/// ```
#[derive(Debug, Clone)]
pub struct DebounceState {
    interval: Interval,
}

impl DebounceState {
    /// Create a debounce state machine.
    pub fn new(interval: Interval) -> Self {
        Self { interval }
    }
}

impl InvocationPolicy for DebounceState {
    fn register_call(&mut self, _now: Instant) -> CallDecision {
        CallDecision::Reschedule {
            delay: self.interval.as_duration(),
        }
    }

    fn register_fire(&mut self, _now: Instant) {}

    fn cancel_pending(&mut self) {}

    fn reset(&mut self) {}
}

/// Throttle state machine.
///
/// Tracks when the callable last ran. A call opens a new window when the
/// callable has never run or the previous window has fully elapsed; calls
/// inside a window are dropped, or held for a trailing fire when enabled.
///
/// # Example
/// ```
/// use call_limiter::{CallDecision, Interval, InvocationPolicy, ThrottleState};
/// use std::time::{Duration, Instant};
///
/// let mut state = ThrottleState::new(Interval::from_millis(500), false);
/// let now = Instant::now();
///
/// assert!(state.register_call(now).is_fire_now());
/// assert!(state.register_call(now + Duration::from_millis(100)).is_drop());
/// assert!(state.register_call(now + Duration::from_millis(500)).is_fire_now());
/// ```
#[derive(Debug, Clone)]
pub struct ThrottleState {
    interval: Interval,
    trailing: bool,
    last_fire: Option<Instant>,
    trailing_pending: bool,
}

impl ThrottleState {
    /// Create a throttle state machine.
    pub fn new(interval: Interval, trailing: bool) -> Self {
        Self {
            interval,
            trailing,
            last_fire: None,
            trailing_pending: false,
        }
    }

    /// When the callable last ran, if ever.
    pub fn last_fire(&self) -> Option<Instant> {
        self.last_fire
    }

    /// Whether a trailing fire is waiting for the window to close.
    pub fn trailing_pending(&self) -> bool {
        self.trailing_pending
    }
}

impl InvocationPolicy for ThrottleState {
    fn register_call(&mut self, now: Instant) -> CallDecision {
        let elapsed = self
            .last_fire
            .map(|last| now.saturating_duration_since(last));

        match elapsed {
            Some(elapsed) if elapsed < self.interval.as_duration() => {
                if !self.trailing {
                    CallDecision::Drop
                } else if self.trailing_pending {
                    CallDecision::Coalesce
                } else {
                    self.trailing_pending = true;
                    CallDecision::Reschedule {
                        delay: self.interval.remaining_after(elapsed),
                    }
                }
            }
            _ => {
                self.last_fire = Some(now);
                self.trailing_pending = false;
                CallDecision::FireNow
            }
        }
    }

    fn register_fire(&mut self, now: Instant) {
        self.last_fire = Some(now);
        self.trailing_pending = false;
    }

    fn cancel_pending(&mut self) {
        self.trailing_pending = false;
    }

    fn reset(&mut self) {
        self.last_fire = None;
        self.trailing_pending = false;
    }
}

/// State machine for either policy.
#[derive(Debug, Clone)]
pub enum PolicyState {
    /// Debounce state
    Debounce(DebounceState),
    /// Throttle state
    Throttle(ThrottleState),
}

impl PolicyState {
    /// When the callable last ran (throttle only).
    pub fn last_fire(&self) -> Option<Instant> {
        match self {
            PolicyState::Debounce(_) => None,
            PolicyState::Throttle(state) => state.last_fire(),
        }
    }
}

impl InvocationPolicy for PolicyState {
    fn register_call(&mut self, now: Instant) -> CallDecision {
        match self {
            PolicyState::Debounce(state) => state.register_call(now),
            PolicyState::Throttle(state) => state.register_call(now),
        }
    }

    fn register_fire(&mut self, now: Instant) {
        match self {
            PolicyState::Debounce(state) => state.register_fire(now),
            PolicyState::Throttle(state) => state.register_fire(now),
        }
    }

    fn cancel_pending(&mut self) {
        match self {
            PolicyState::Debounce(state) => state.cancel_pending(),
            PolicyState::Throttle(state) => state.cancel_pending(),
        }
    }

    fn reset(&mut self) {
        match self {
            PolicyState::Debounce(state) => state.reset(),
            PolicyState::Throttle(state) => state.reset(),
        }
    }
}
