//! Wall-clock time arithmetic: "HH:MM" strings to minute offsets and back.
//!
//! All scheduling math (conflict intervals, slot grids) runs on integer
//! minutes since midnight.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time format: {0:?} (expected \"HH:MM\")")]
pub struct InvalidTimeFormat(pub String);

/// Parse "HH:MM" into minutes since midnight.
///
/// Fails when the string is not exactly two colon-separated integer fields.
/// No range check is applied here; callers needing within-day semantics must
/// verify the result lies in `0..=1439` themselves.
pub fn parse_time(s: &str) -> Result<i32, InvalidTimeFormat> {
    let mut parts = s.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(hours), Some(minutes), None) => {
            let hours: i32 = hours
                .parse()
                .map_err(|_| InvalidTimeFormat(s.to_string()))?;
            let minutes: i32 = minutes
                .parse()
                .map_err(|_| InvalidTimeFormat(s.to_string()))?;
            Ok(hours * 60 + minutes)
        }
        _ => Err(InvalidTimeFormat(s.to_string())),
    }
}

/// Format a minute offset as "HH:MM", zero-padded. Values past 23:59 still
/// format (the hour field simply exceeds 23).
pub fn format_time(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// True when a minute offset is a valid within-day time of day.
pub fn is_within_day(minutes: i32) -> bool {
    (0..=1439).contains(&minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_times() {
        assert_eq!(parse_time("00:00"), Ok(0));
        assert_eq!(parse_time("09:00"), Ok(540));
        assert_eq!(parse_time("10:30"), Ok(630));
        assert_eq!(parse_time("23:59"), Ok(1439));
    }

    #[test]
    fn parse_rejects_malformed_strings() {
        for bad in ["", "9", "abc", "09:xx", "xx:00", "09:00:00", "9.30"] {
            assert!(parse_time(bad).is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn format_zero_pads_both_fields() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(540), "09:00");
        assert_eq!(format_time(605), "10:05");
        assert_eq!(format_time(1439), "23:59");
    }

    #[test]
    fn format_does_not_wrap_past_midnight() {
        // Out-of-range offsets still format; within-day checks live upstream.
        assert_eq!(format_time(1530), "25:30");
        assert_eq!(parse_time("25:30"), Ok(1530));
    }

    #[test]
    fn round_trips_every_minute_of_the_day() {
        for minute in 0..=1439 {
            assert_eq!(parse_time(&format_time(minute)), Ok(minute));
        }
    }

    #[test]
    fn within_day_bounds() {
        assert!(is_within_day(0));
        assert!(is_within_day(1439));
        assert!(!is_within_day(-1));
        assert!(!is_within_day(1440));
    }
}
