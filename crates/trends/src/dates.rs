use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::TrendError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse the calendar day out of a loosely ISO-formatted date or timestamp.
pub fn parse_day(raw: &str) -> Result<NaiveDate, TrendError> {
    let s = raw.trim();

    for fmt in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(day);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts.date());
        }
    }

    Err(TrendError::MalformedDate { raw: raw.to_string() })
}

/// Every day in `[start, end]`; empty when `start > end`.
pub fn day_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_accepted_formats() {
        assert_eq!(parse_day("2025-10-05").unwrap(), ymd(2025, 10, 5));
        assert_eq!(parse_day(" 2025/10/05 ").unwrap(), ymd(2025, 10, 5));
        assert_eq!(parse_day("2025-10-05T23:10:00Z").unwrap(), ymd(2025, 10, 5));
        assert_eq!(parse_day("2025-10-05T23:10:00-04:00").unwrap(), ymd(2025, 10, 5));
        assert_eq!(parse_day("2025-10-05 08:00:00").unwrap(), ymd(2025, 10, 5));
        assert_eq!(parse_day("2025-10-05T08:00:00.250").unwrap(), ymd(2025, 10, 5));
    }

    #[test]
    fn test_malformed_dates() {
        for raw in ["unknown", "", "2025-13-01", "2025-02-30", "yesterday", "05/10/2025x"] {
            assert!(
                matches!(parse_day(raw), Err(TrendError::MalformedDate { .. })),
                "{:?} should not parse",
                raw
            );
        }
    }

    #[test]
    fn test_day_range_inclusive() {
        let days = day_range(ymd(2025, 12, 30), ymd(2026, 1, 2));
        assert_eq!(days.len(), 4);
        assert_eq!(format_day(days[3]), "2026-01-02");
    }

    #[test]
    fn test_day_range_reversed_is_empty() {
        assert!(day_range(ymd(2025, 10, 3), ymd(2025, 10, 1)).is_empty());
        assert_eq!(day_range(ymd(2025, 10, 3), ymd(2025, 10, 3)).len(), 1);
    }
}
