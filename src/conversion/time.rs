//! Time and duration leaves
//!
//! Both are `(sec, nsec)` pairs with `nsec` normalized into `0..1e9`. The
//! host sees them as floating-point seconds.

use std::fmt;

const NSEC_PER_SEC: i64 = 1_000_000_000;

/// Split seconds into a normalized `(sec, nsec)` pair
///
/// Callers clamp `seconds` to the target range first; `seconds` is finite.
fn split_seconds(seconds: f64) -> (i64, i64) {
    let mut sec = seconds.floor() as i64;
    let mut nsec = ((seconds - sec as f64) * 1e9).round() as i64;
    if nsec >= NSEC_PER_SEC {
        sec = sec.saturating_add(1);
        nsec -= NSEC_PER_SEC;
    }
    (sec, nsec)
}

/// Point in time since the epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time {
    pub sec: u32,
    pub nsec: u32,
}

impl Time {
    pub const ZERO: Time = Time { sec: 0, nsec: 0 };
    /// Smallest representable time; marks an unset stamp
    pub const MIN: Time = Time { sec: 0, nsec: 1 };
    /// Largest representable time; marks an unset stamp
    pub const MAX: Time = Time { sec: u32::MAX, nsec: 999_999_999 };

    pub const fn new(sec: u32, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// Seconds to time; NaN and negative values give zero, overflow saturates
    pub fn from_sec(seconds: f64) -> Self {
        if seconds.is_nan() || seconds <= 0.0 {
            return Self::ZERO;
        }
        if seconds >= u32::MAX as f64 + 1.0 {
            return Self::MAX;
        }
        let (sec, nsec) = split_seconds(seconds);
        if sec > u32::MAX as i64 {
            return Self::MAX;
        }
        Self { sec: sec as u32, nsec: nsec as u32 }
    }

    pub fn to_sec(self) -> f64 {
        self.sec as f64 + self.nsec as f64 * 1e-9
    }

    /// Whether this is one of the "unset" sentinels
    pub fn is_sentinel(self) -> bool {
        self == Self::MIN || self == Self::MAX
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}

/// Signed time span
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration {
    pub sec: i32,
    pub nsec: i32,
}

impl Duration {
    pub const ZERO: Duration = Duration { sec: 0, nsec: 0 };
    pub const MIN: Duration = Duration { sec: i32::MIN, nsec: 0 };
    pub const MAX: Duration = Duration { sec: i32::MAX, nsec: 999_999_999 };

    pub const fn new(sec: i32, nsec: i32) -> Self {
        Self { sec, nsec }
    }

    /// Seconds to duration; NaN gives zero, overflow saturates
    pub fn from_sec(seconds: f64) -> Self {
        if seconds.is_nan() {
            return Self::ZERO;
        }
        if seconds >= i32::MAX as f64 + 1.0 {
            return Self::MAX;
        }
        if seconds <= i32::MIN as f64 {
            return Self::MIN;
        }
        let (sec, nsec) = split_seconds(seconds);
        if sec > i32::MAX as i64 {
            return Self::MAX;
        }
        Self { sec: sec as i32, nsec: nsec as i32 }
    }

    pub fn to_sec(self) -> f64 {
        self.sec as f64 + self.nsec as f64 * 1e-9
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.to_sec())
    }
}
