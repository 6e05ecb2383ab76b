// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format a timestamp the way the dashboard lists dates ("M/D/YYYY").
pub fn format_display_date(date: DateTime<Utc>) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

/// Parse a stored instant written by the mobile app.
///
/// Accepts RFC3339, naive ISO 8601 (read as UTC, with `T` or a space) and
/// integer epoch milliseconds. Returns `None` for anything else.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(parse_instant("2024-01-01T09:00:00Z"), Some(expected));
        assert_eq!(parse_instant("2024-01-01T09:00:00"), Some(expected));
        assert_eq!(parse_instant("2024-01-01 09:00:00"), Some(expected));
        assert_eq!(parse_instant("2024-01-01T10:00:00+01:00"), Some(expected));
    }

    #[test]
    fn parses_epoch_millis() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(
            parse_instant(&expected.timestamp_millis().to_string()),
            Some(expected)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_instant(""), None);
        assert_eq!(parse_instant("yesterday"), None);
    }

    #[test]
    fn display_date_has_no_padding() {
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 0).unwrap();
        assert_eq!(format_display_date(date), "3/5/2024");
    }
}
