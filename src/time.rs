//! Fixed-point simulation time.
//!
//! All scheduling happens on an integer time base so that event ordering is
//! exact and reproducible. One tick is one picosecond, which gives a range
//! of a little over 100 days of simulated time in an `i64`.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A point in (or span of) simulated time, in picoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time(i64);

impl Time {
    /// Ticks per second.
    pub const RESOLUTION: i64 = 1_000_000_000_000;

    /// Time zero.
    pub const ZERO: Time = Time(0);

    /// A time that is never reached.
    pub const NEVER: Time = Time(i64::MAX);

    /// Create a time from raw ticks.
    pub const fn from_raw(raw: i64) -> Self {
        Time(raw)
    }

    /// Raw ticks.
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Create a time from picoseconds.
    pub const fn from_psec(ps: i64) -> Self {
        Time(ps)
    }

    /// Create a time from nanoseconds.
    pub const fn from_nsec(ns: i64) -> Self {
        Time(ns * 1_000)
    }

    /// Create a time from microseconds.
    pub const fn from_usec(us: i64) -> Self {
        Time(us * 1_000_000)
    }

    /// Create a time from milliseconds.
    pub const fn from_msec(ms: i64) -> Self {
        Time(ms * 1_000_000_000)
    }

    /// Create a time from whole seconds.
    pub const fn from_sec(s: i64) -> Self {
        Time(s * Self::RESOLUTION)
    }

    /// Create a time from seconds, rounded to the nearest tick.
    pub fn from_double(secs: f64) -> Self {
        Time((secs * Self::RESOLUTION as f64).round() as i64)
    }

    /// The period of a frequency in Hz.
    pub fn from_hz(hz: f64) -> Self {
        Self::from_double(1.0 / hz)
    }

    /// This time in seconds.
    pub fn as_double(self) -> f64 {
        self.0 as f64 / Self::RESOLUTION as f64
    }

    /// Check if this time lies before zero.
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = *self + rhs;
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<i64> for Time {
    type Output = Time;

    fn mul(self, rhs: i64) -> Time {
        Time(self.0.saturating_mul(rhs))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Time::NEVER {
            return write!(f, "never");
        }
        let ps = self.0.unsigned_abs();
        let secs = self.as_double();
        if ps < 1_000 {
            write!(f, "{} ps", self.0)
        } else if ps < 1_000_000 {
            write!(f, "{:.3} ns", secs * 1e9)
        } else if ps < 1_000_000_000 {
            write!(f, "{:.3} us", secs * 1e6)
        } else if ps < 1_000_000_000_000 {
            write!(f, "{:.3} ms", secs * 1e3)
        } else {
            write!(f, "{:.6} s", secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversions() {
        assert_eq!(Time::from_nsec(1).raw(), 1_000);
        assert_eq!(Time::from_usec(1), Time::from_nsec(1_000));
        assert_eq!(Time::from_msec(1), Time::from_usec(1_000));
        assert_eq!(Time::from_sec(1).raw(), Time::RESOLUTION);
        assert_eq!(Time::from_double(2.5e-9), Time::from_psec(2_500));
    }

    #[test]
    fn test_from_hz() {
        // 1 MHz -> 1 us period
        assert_eq!(Time::from_hz(1e6), Time::from_usec(1));
        let t = Time::from_hz(48_000.0);
        assert!((t.as_double() - 1.0 / 48_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let t = Time::NEVER + Time::from_nsec(5);
        assert_eq!(t, Time::NEVER);
        assert!((Time::ZERO - Time::from_nsec(1)).is_negative());
    }

    #[test]
    fn test_display() {
        assert_eq!(Time::from_nsec(15).to_string(), "15.000 ns");
        assert_eq!(Time::from_psec(12).to_string(), "12 ps");
        assert_eq!(Time::from_msec(3).to_string(), "3.000 ms");
    }
}
