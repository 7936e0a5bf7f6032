//! Utilities to deal with date-time types.

use std::time::{Duration, SystemTime};

/// Returns the seconds elapsed since the UNIX epoch as a float with sub-second precision.
///
/// Times before the epoch are clamped to `0.0`.
pub fn epoch_seconds(time: SystemTime) -> f64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Returns the current time in seconds since the UNIX epoch.
#[inline]
pub fn now_epoch_seconds() -> f64 {
    epoch_seconds(SystemTime::now())
}

/// Returns the whole milliseconds of a duration, saturating at `u64::MAX`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_seconds_fraction() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(epoch_seconds(time), 1.5);
    }

    #[test]
    fn test_epoch_seconds_before_epoch() {
        let time = SystemTime::UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(epoch_seconds(time), 0.0);
    }

    #[test]
    fn test_duration_millis() {
        assert_eq!(duration_millis(Duration::from_micros(2_100_500)), 2100);
    }
}
