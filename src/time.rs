//! Wall clock helpers.

use chrono::Utc;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Current wall clock time, whole seconds since the unix epoch.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Current wall clock time in nanoseconds, truncated to the second.
pub fn now_ns() -> i64 {
    seconds_to_ns(now())
}

/// Truncate a nanosecond timestamp to whole seconds.
#[inline]
pub fn ns_to_seconds(ns: i64) -> i64 {
    ns / NANOS_PER_SECOND
}

#[inline]
pub fn seconds_to_ns(seconds: i64) -> i64 {
    seconds.wrapping_mul(NANOS_PER_SECOND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(ns_to_seconds(1_999_999_999), 1);
        assert_eq!(ns_to_seconds(999_999_999), 0);
        assert_eq!(ns_to_seconds(-1_500_000_000), -1);
    }

    #[test]
    fn now_ns_is_whole_seconds() {
        assert_eq!(now_ns() % NANOS_PER_SECOND, 0);
        assert!(now() > 0);
    }
}
