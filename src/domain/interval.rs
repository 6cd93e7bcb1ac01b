//! Validated invocation intervals.
//!
//! An `Interval` is the quiet period of a debounce or the window length of a
//! throttle. Built from a `Duration` it is always valid; built from a raw
//! millisecond value it is checked for sign and finiteness.

use std::fmt;
use std::time::Duration;

/// Error returned when a raw interval value is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntervalError {
    /// The interval was below zero (value in milliseconds)
    Negative(f64),
    /// The interval was NaN or infinite
    NotFinite,
    /// The interval does not fit in a `Duration`
    Overflow,
}

impl fmt::Display for IntervalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalError::Negative(ms) => {
                write!(f, "interval must be non-negative, got {}ms", ms)
            }
            IntervalError::NotFinite => write!(f, "interval must be a finite number"),
            IntervalError::Overflow => write!(f, "interval is too large to represent"),
        }
    }
}

impl std::error::Error for IntervalError {}

/// Non-negative, finite time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Interval(Duration);

impl Interval {
    /// The zero interval.
    pub const ZERO: Interval = Interval(Duration::ZERO);

    /// Create an interval from a duration.
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Create an interval from whole milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Create an interval from a floating-point millisecond value.
    ///
    /// # Errors
    /// Returns `IntervalError::Negative` for values below zero,
    /// `IntervalError::NotFinite` for NaN or infinities and
    /// `IntervalError::Overflow` when the value does not fit in a `Duration`.
    ///
    /// # Example
    /// ```
    /// use call_limiter::{Interval, IntervalError};
    ///
    /// assert_eq!(Interval::from_millis_f64(300.0).unwrap(), Interval::from_millis(300));
    /// assert_eq!(Interval::from_millis_f64(-5.0), Err(IntervalError::Negative(-5.0)));
    /// assert_eq!(Interval::from_millis_f64(f64::NAN), Err(IntervalError::NotFinite));
    /// ```
    pub fn from_millis_f64(millis: f64) -> Result<Self, IntervalError> {
        if !millis.is_finite() {
            return Err(IntervalError::NotFinite);
        }
        if millis < 0.0 {
            return Err(IntervalError::Negative(millis));
        }

        Duration::try_from_secs_f64(millis / 1000.0)
            .map(Self)
            .map_err(|_| IntervalError::Overflow)
    }

    /// Get the interval as a duration.
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Check whether this is the zero interval.
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Time left in the interval once `elapsed` has passed (zero if over).
    pub fn remaining_after(&self, elapsed: Duration) -> Duration {
        self.0.saturating_sub(elapsed)
    }
}

impl From<Duration> for Interval {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl From<Interval> for Duration {
    fn from(interval: Interval) -> Self {
        interval.0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis_f64_accepts_valid_values() {
        assert_eq!(Interval::from_millis_f64(0.0), Ok(Interval::ZERO));
        assert_eq!(
            Interval::from_millis_f64(250.0),
            Ok(Interval::from_millis(250))
        );
        assert_eq!(
            Interval::from_millis_f64(0.5).map(|i| i.as_duration()),
            Ok(Duration::from_micros(500))
        );
    }

    #[test]
    fn test_negative_interval_rejected() {
        assert_eq!(
            Interval::from_millis_f64(-5.0),
            Err(IntervalError::Negative(-5.0))
        );
        assert!(Interval::from_millis_f64(-0.001).is_err());
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(Interval::from_millis_f64(-0.0), Ok(Interval::ZERO));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(
            Interval::from_millis_f64(f64::NAN),
            Err(IntervalError::NotFinite)
        );
        assert_eq!(
            Interval::from_millis_f64(f64::INFINITY),
            Err(IntervalError::NotFinite)
        );
        assert_eq!(
            Interval::from_millis_f64(f64::NEG_INFINITY),
            Err(IntervalError::NotFinite)
        );
    }

    #[test]
    fn test_overflow_rejected() {
        assert_eq!(
            Interval::from_millis_f64(f64::MAX),
            Err(IntervalError::Overflow)
        );
    }

    #[test]
    fn test_remaining_after() {
        let interval = Interval::from_millis(500);
        assert_eq!(
            interval.remaining_after(Duration::from_millis(100)),
            Duration::from_millis(400)
        );
        assert_eq!(
            interval.remaining_after(Duration::from_millis(900)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            IntervalError::Negative(-5.0).to_string(),
            "interval must be non-negative, got -5ms"
        );
        assert_eq!(
            IntervalError::NotFinite.to_string(),
            "interval must be a finite number"
        );
    }
}
