//! Numeric-to-duration conversions and named timeouts.
//!
//! Integer literals need a suffix so the compiler can pick an impl:
//!
//! ```
//! use expectkit_core::DurationExt;
//! use std::time::Duration;
//!
//! assert_eq!(3u64.milliseconds(), Duration::from_millis(3));
//! assert_eq!(0.5f64.seconds(), Duration::from_millis(500));
//! ```

use std::time::Duration;

/// Timeout used when a wait does not name one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// A very short timeout, for waits that should already be satisfied.
pub const TINY: Duration = Duration::from_millis(1);

/// A short timeout, long enough for a thread hop or two.
pub const SMALL: Duration = Duration::from_millis(500);

/// Unit conversions from plain numbers to [`Duration`].
pub trait DurationExt {
    /// Interprets the value as nanoseconds.
    fn nanoseconds(self) -> Duration;
    /// Interprets the value as microseconds.
    fn microseconds(self) -> Duration;
    /// Interprets the value as milliseconds.
    fn milliseconds(self) -> Duration;
    /// Interprets the value as seconds.
    fn seconds(self) -> Duration;
    /// Interprets the value as minutes.
    fn minutes(self) -> Duration;
}

impl DurationExt for u64 {
    fn nanoseconds(self) -> Duration {
        Duration::from_nanos(self)
    }

    fn microseconds(self) -> Duration {
        Duration::from_micros(self)
    }

    fn milliseconds(self) -> Duration {
        Duration::from_millis(self)
    }

    fn seconds(self) -> Duration {
        Duration::from_secs(self)
    }

    fn minutes(self) -> Duration {
        Duration::from_secs(self.saturating_mul(60))
    }
}

impl DurationExt for u32 {
    fn nanoseconds(self) -> Duration {
        u64::from(self).nanoseconds()
    }

    fn microseconds(self) -> Duration {
        u64::from(self).microseconds()
    }

    fn milliseconds(self) -> Duration {
        u64::from(self).milliseconds()
    }

    fn seconds(self) -> Duration {
        u64::from(self).seconds()
    }

    fn minutes(self) -> Duration {
        u64::from(self).minutes()
    }
}

impl DurationExt for f64 {
    fn nanoseconds(self) -> Duration {
        secs_f64(self / 1e9)
    }

    fn microseconds(self) -> Duration {
        secs_f64(self / 1e6)
    }

    fn milliseconds(self) -> Duration {
        secs_f64(self / 1e3)
    }

    fn seconds(self) -> Duration {
        secs_f64(self)
    }

    fn minutes(self) -> Duration {
        secs_f64(self * 60.0)
    }
}

/// Negative and NaN inputs clamp to zero, overflow clamps to `Duration::MAX`.
fn secs_f64(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}
