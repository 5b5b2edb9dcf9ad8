//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, the coerced representation of every timestamp field.
//! Whatever offset an input carries, the stored instant is UTC, and it is
//! always rendered as RFC 3339 with a `Z` suffix.
//!
//! ## Accepted Layouts
//!
//! [`Timestamp::parse()`] is the strict parser: RFC 3339 only, with an
//! explicit offset (`Z`, `+05:30`, ...). Offsets are converted to UTC.
//!
//! [`Timestamp::parse_lenient()`] additionally accepts the layouts people
//! actually type into forms and config files:
//!
//! - `2019-06-01 12:22:00+02:00` (RFC 3339 with a space separator)
//! - `2019-06-01T12:22:00.5` / `2019-06-01 12:22` (naive, assumed UTC)
//! - `2019-06-01` (midnight UTC)
//!
//! Leading or trailing characters are never tolerated.
//!
//! ## Range
//!
//! Every parser rejects instants whose UTC year falls outside 0000-9999,
//! the range RFC 3339 can write with a four-digit year.
//!
//! ## Rendering
//!
//! [`Timestamp::to_rfc3339()`] emits sub-second digits only when the
//! instant has them, so a rendered timestamp always re-parses to the same
//! instant under the strict parser.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TimestampError;

/// UTC years representable as a four-digit RFC 3339 year.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 0..=9999;

/// Naive layouts tried by the lenient parser, most specific first.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A UTC timestamp.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`.
/// - [`Timestamp::parse()`]: strict RFC 3339.
/// - [`Timestamp::parse_lenient()`]: RFC 3339 plus common naive layouts.
/// - [`Timestamp::from_epoch_secs()`]: from Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap a `chrono::DateTime<Utc>`.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// Any explicit offset is accepted and converted to UTC. Strings without
    /// an offset are rejected; use [`Timestamp::parse_lenient()`] for those.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Invalid`] if the string is not valid RFC 3339.
    pub fn parse(s: &str) -> Result<Self, TimestampError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| TimestampError::Invalid {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::checked(dt.with_timezone(&Utc), s)
    }

    /// Parse a timestamp from RFC 3339 or one of the naive layouts listed
    /// in the module documentation. Naive inputs are assumed to be UTC.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Invalid`] if no layout matches the whole
    /// input.
    pub fn parse_lenient(s: &str) -> Result<Self, TimestampError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Self::checked(dt.with_timezone(&Utc), s);
        }

        // RFC 3339 allows a space in place of the `T` separator.
        if s.len() > 10 && s.as_bytes()[10] == b' ' {
            let with_t = format!("{}T{}", &s[..10], &s[11..]);
            if let Ok(dt) = DateTime::parse_from_rfc3339(&with_t) {
                return Self::checked(dt.with_timezone(&Utc), s);
            }
        }

        for layout in NAIVE_LAYOUTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
                return Self::checked(naive.and_utc(), s);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Self::checked(midnight.and_utc(), s);
            }
        }

        Err(TimestampError::Invalid {
            input: s.to_string(),
            reason: "expected RFC 3339, YYYY-MM-DD HH:MM[:SS], or YYYY-MM-DD".to_string(),
        })
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::OutOfRange`] if the instant falls outside
    /// years 0000-9999.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, TimestampError> {
        DateTime::from_timestamp(secs, 0)
            .filter(|dt| YEAR_RANGE.contains(&dt.year()))
            .map(Self)
            .ok_or(TimestampError::OutOfRange(secs))
    }

    fn checked(dt: DateTime<Utc>, input: &str) -> Result<Self, TimestampError> {
        if YEAR_RANGE.contains(&dt.year()) {
            Ok(Self(dt))
        } else {
            Err(TimestampError::Invalid {
                input: input.to_string(),
                reason: format!("year {} is outside 0000-9999", dt.year()),
            })
        }
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as RFC 3339 with a `Z` suffix (e.g. `2019-06-01T12:22:00Z`).
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_to_rfc3339_format() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.to_rfc3339(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_display_matches_rfc3339() {
        let dt = Utc.with_ymd_and_hms(2026, 6, 30, 23, 59, 59).unwrap();
        let ts = Timestamp::from_utc(dt);
        assert_eq!(format!("{ts}"), ts.to_rfc3339());
    }

    #[test]
    fn test_subseconds_preserved() {
        let ts = Timestamp::parse("2026-01-15T12:00:00.250Z").unwrap();
        assert_eq!(ts.as_datetime().nanosecond(), 250_000_000);
        assert_eq!(ts.to_rfc3339(), "2026-01-15T12:00:00.250Z");
    }

    // ---- parse() strict mode ----

    #[test]
    fn test_parse_z_suffix_accepted() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_converts_offset() {
        let ts = Timestamp::parse("2026-01-15T17:00:00+05:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_rejects_naive() {
        assert!(Timestamp::parse("2026-01-15T12:00:00").is_err());
        assert!(Timestamp::parse("2026-01-15 12:00").is_err());
        assert!(Timestamp::parse("2026-01-15").is_err());
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    // ---- parse_lenient() ----

    #[test]
    fn test_parse_lenient_minutes_only() {
        let ts = Timestamp::parse_lenient("2019-06-01 12:22").unwrap();
        assert_eq!(ts.to_rfc3339(), "2019-06-01T12:22:00Z");
    }

    #[test]
    fn test_parse_lenient_naive_with_fraction() {
        let ts = Timestamp::parse_lenient("2019-06-01T12:22:05.5").unwrap();
        assert_eq!(ts.to_rfc3339(), "2019-06-01T12:22:05.500Z");
    }

    #[test]
    fn test_parse_lenient_space_separated_offset() {
        let ts = Timestamp::parse_lenient("2019-06-01 14:22:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2019-06-01T12:22:00Z");
    }

    #[test]
    fn test_parse_lenient_date_only() {
        let ts = Timestamp::parse_lenient("2019-06-01").unwrap();
        assert_eq!(ts.to_rfc3339(), "2019-06-01T00:00:00Z");
    }

    #[test]
    fn test_parse_lenient_rejects_trailing_characters() {
        assert!(Timestamp::parse_lenient("2019-06-01 12:22x").is_err());
        assert!(Timestamp::parse_lenient(" 2019-06-01").is_err());
        assert!(Timestamp::parse_lenient("2019-06-01junk").is_err());
    }

    // ---- epoch ----

    #[test]
    fn test_epoch_roundtrip() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let secs = ts.epoch_secs();
        let ts2 = Timestamp::from_epoch_secs(secs).unwrap();
        assert_eq!(ts, ts2);
    }

    #[test]
    fn test_epoch_out_of_range() {
        assert_eq!(
            Timestamp::from_epoch_secs(i64::MAX),
            Err(TimestampError::OutOfRange(i64::MAX))
        );
    }

    #[test]
    fn test_epoch_beyond_year_9999_rejected() {
        assert_eq!(
            Timestamp::from_epoch_secs(300_000_000_000),
            Err(TimestampError::OutOfRange(300_000_000_000))
        );
        assert!(Timestamp::from_epoch_secs(253_402_300_799).is_ok());
        assert!(Timestamp::from_epoch_secs(253_402_300_800).is_err());
    }

    #[test]
    fn test_offset_crossing_year_bounds_rejected() {
        assert!(Timestamp::parse("9999-12-31T23:00:00-05:00").is_err());
        assert!(Timestamp::parse_lenient("9999-12-31 23:00:00-05:00").is_err());
        assert!(Timestamp::parse("0000-01-01T01:00:00+05:00").is_err());
        assert!(Timestamp::parse("9999-12-31T23:59:59Z").is_ok());
    }

    #[test]
    fn test_lenient_rejects_five_digit_years() {
        assert!(Timestamp::parse_lenient("+11476-08-15T05:20:00Z").is_err());
        assert!(Timestamp::parse_lenient("+12345-01-01T00:00:00").is_err());
    }

    // ---- ordering ----

    #[test]
    fn test_ordering() {
        let earlier = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let later = Timestamp::parse("2026-01-15T12:00:01Z").unwrap();
        assert!(earlier < later);
    }

    // ---- serde ----

    #[test]
    fn test_serde_roundtrip() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2026-01-15T12:00:00Z\"");
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }
}
