//! Strict ISO-8601 date-time recognition.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-?(?:[1-9][0-9]*)?[0-9]{4})-(1[0-2]|0[1-9])-(3[01]|0[1-9]|[12][0-9])T(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])(\.[0-9]+)?(Z)?$",
    )
    .expect("Invalid ISO date regex")
});

/// Whether `text` has the `YYYY-MM-DDTHH:MM:SS[.fraction][Z]` shape.
pub fn is_iso_date(text: &str) -> bool {
    ISO_DATE.is_match(text)
}

/// Parse an ISO-8601 date-time into an instant.
///
/// A missing `Z` is read as UTC. Days past the end of the month roll over
/// into the next month (`2021-02-31` is March 3rd). Returns `None` when the
/// shape is wrong or the year is outside the representable range.
pub fn parse_iso_date(text: &str) -> Option<DateTime<Utc>> {
    let caps = ISO_DATE.captures(text)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str());

    let year: i32 = field(1)?.parse().ok()?;
    let month: u32 = field(2)?.parse().ok()?;
    let day: u64 = field(3)?.parse().ok()?;
    let hour: u32 = field(4)?.parse().ok()?;
    let minute: u32 = field(5)?.parse().ok()?;
    let second: u32 = field(6)?.parse().ok()?;
    let nanos = field(7).map(fraction_to_nanos).unwrap_or(0);

    let date = NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(day - 1))?;
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    Some(date.and_time(time).and_utc())
}

// ".5" -> 500_000_000; digits past nanosecond precision are dropped.
fn fraction_to_nanos(fraction: &str) -> u32 {
    let digits = fraction.trim_start_matches('.');
    let mut nanos: u32 = 0;
    for (i, d) in digits.bytes().take(9).enumerate() {
        nanos += u32::from(d - b'0') * 10u32.pow(8 - i as u32);
    }
    nanos
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_accepts_basic_forms() {
        assert!(is_iso_date("2020-01-01T00:00:00Z"));
        assert!(is_iso_date("2020-01-01T00:00:00"));
        assert!(is_iso_date("2020-12-31T23:59:59.123Z"));
        assert!(is_iso_date("-0044-03-15T12:00:00Z"));
        assert!(is_iso_date("12020-01-01T00:00:00Z"));
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        assert!(!is_iso_date("2020-13-01T00:00:00Z"));
        assert!(!is_iso_date("2020-00-01T00:00:00Z"));
        assert!(!is_iso_date("2020-01-32T00:00:00Z"));
        assert!(!is_iso_date("2020-01-01T24:00:00Z"));
        assert!(!is_iso_date("2020-01-01T00:60:00Z"));
        assert!(!is_iso_date("2020-01-01"));
        assert!(!is_iso_date("2020-01-01T00:00:00+02:00"));
        assert!(!is_iso_date("2020-01-01t00:00:00z"));
    }

    #[test]
    fn test_parse_fraction() {
        let at = parse_iso_date("2020-01-01T10:20:30.25Z").unwrap();
        assert_eq!(at.hour(), 10);
        assert_eq!(at.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_parse_day_rollover() {
        let at = parse_iso_date("2021-02-31T00:00:00Z").unwrap();
        assert_eq!((at.month(), at.day()), (3, 3));
    }

    #[test]
    fn test_parse_negative_year() {
        let at = parse_iso_date("-0044-03-15T00:00:00Z").unwrap();
        assert_eq!(at.year(), -44);
    }

    #[test]
    fn test_parse_unrepresentable_year() {
        assert!(is_iso_date("99999999-01-01T00:00:00Z"));
        assert!(parse_iso_date("99999999-01-01T00:00:00Z").is_none());
    }
}
