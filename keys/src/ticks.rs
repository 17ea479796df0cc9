use chrono::{DateTime, Utc};

/// 100ns ticks per second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks between 1582-10-15T00:00:00Z, the Gregorian calendar reform, and the Unix epoch.
pub const GREGORIAN_TO_UNIX_TICKS: i64 = 122_192_928_000_000_000;

/// Returns the number of 100ns ticks elapsed between the Gregorian reform and `now`.
///
/// Saturates instead of overflowing for instants tens of thousands of years away.
pub fn ticks_since_gregorian_reform(now: DateTime<Utc>) -> i64 {
    now.timestamp()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(i64::from(now.timestamp_subsec_nanos() / 100))
        .saturating_add(GREGORIAN_TO_UNIX_TICKS)
}
