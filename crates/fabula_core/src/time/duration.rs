//! Free-form duration text <-> canonical milliseconds.
//!
//! # Responsibility
//! - Canonicalize user-entered durations ("2 hours", "3 days") to ms.
//! - Render canonical ms back to the largest exact unit.
//!
//! # Invariants
//! - Parsing never fails: unrecognized text degrades to `0`.
//! - Parsed values are always `>= 0`.
//! - `parse_duration(&format_duration(ms)) == ms` whenever `format_duration`
//!   picked an exact unit.

use once_cell::sync::Lazy;
use regex::Regex;

/// One minute in milliseconds.
pub const MINUTE_MS: i64 = 60_000;
/// One hour in milliseconds.
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * HOUR_MS;
/// One week in milliseconds.
pub const WEEK_MS: i64 = 7 * DAY_MS;
/// Approximate month (30 days).
pub const MONTH_MS: i64 = 30 * DAY_MS;
/// Approximate year (365 days).
pub const YEAR_MS: i64 = 365 * DAY_MS;

static LEADING_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));

/// Keyword match order for parsing. `min` must win over everything else so
/// "minutes" is never read as a month.
const PARSE_UNITS: &[(&str, i64)] = &[
    ("min", MINUTE_MS),
    ("hour", HOUR_MS),
    ("week", WEEK_MS),
    ("month", MONTH_MS),
    ("year", YEAR_MS),
    ("day", DAY_MS),
];

/// Largest unit first.
const FORMAT_UNITS: &[(&str, i64)] = &[
    ("year", YEAR_MS),
    ("month", MONTH_MS),
    ("week", WEEK_MS),
    ("day", DAY_MS),
    ("hour", HOUR_MS),
    ("minute", MINUTE_MS),
];

/// Parses free-form duration text into milliseconds.
///
/// The first numeric token is the quantity (defaults to `1` when absent), the
/// first unit keyword found in priority order is the unit. Text without a
/// known unit yields `0`.
pub fn parse_duration(text: &str) -> i64 {
    let lowered = text.to_lowercase();
    let quantity = LEADING_NUMBER_RE
        .find(lowered.as_str())
        .and_then(|found| found.as_str().parse::<f64>().ok())
        .unwrap_or(1.0);

    let Some(multiplier) = PARSE_UNITS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, multiplier)| *multiplier)
    else {
        return 0;
    };

    let value = (quantity * multiplier as f64).round();
    if value.is_finite() && value > 0.0 {
        value.min(i64::MAX as f64) as i64
    } else {
        0
    }
}

/// Formats milliseconds using the largest unit that divides `ms` exactly.
///
/// Values with no exact unit fall back to fractional days (two decimals)
/// when at least one day long, whole minutes otherwise. `ms <= 0` formats to
/// an empty string.
pub fn format_duration(ms: i64) -> String {
    if ms <= 0 {
        return String::new();
    }

    for (unit, size) in FORMAT_UNITS {
        if ms % size == 0 {
            return with_unit(ms / size, unit);
        }
    }

    let days = ms as f64 / DAY_MS as f64;
    if days >= 1.0 {
        let rounded = (days * 100.0).round() / 100.0;
        return format!("{rounded} days");
    }

    let minutes = (ms as f64 / MINUTE_MS as f64).round() as i64;
    with_unit(minutes, "minute")
}

fn with_unit(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_quantity_and_unit() {
        assert_eq!(parse_duration("2 hours"), 2 * HOUR_MS);
        assert_eq!(parse_duration("3 Days"), 3 * DAY_MS);
        assert_eq!(parse_duration("45 min"), 45 * MINUTE_MS);
        assert_eq!(parse_duration("1.5 weeks"), WEEK_MS + WEEK_MS / 2);
    }

    #[test]
    fn parse_defaults_quantity_to_one() {
        assert_eq!(parse_duration("a fortnight-ish week"), WEEK_MS);
        assert_eq!(parse_duration("year"), YEAR_MS);
    }

    #[test]
    fn parse_prefers_minutes_over_later_keywords() {
        assert_eq!(parse_duration("10 minutes"), 10 * MINUTE_MS);
    }

    #[test]
    fn parse_unknown_unit_is_zero() {
        assert_eq!(parse_duration("forever"), 0);
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("12"), 0);
    }

    #[test]
    fn format_picks_largest_exact_unit() {
        assert_eq!(format_duration(7_776_000_000), "3 months");
        assert_eq!(format_duration(YEAR_MS), "1 year");
        assert_eq!(format_duration(2 * WEEK_MS), "2 weeks");
        assert_eq!(format_duration(36 * HOUR_MS), "36 hours");
        assert_eq!(format_duration(MINUTE_MS), "1 minute");
    }

    #[test]
    fn format_non_positive_is_empty() {
        assert_eq!(format_duration(0), "");
        assert_eq!(format_duration(-5), "");
    }

    #[test]
    fn format_falls_back_for_inexact_values() {
        assert_eq!(format_duration(DAY_MS + DAY_MS / 2 + 1), "1.5 days");
        assert_eq!(format_duration(90_500), "2 minutes");
    }

    #[test]
    fn exact_outputs_reparse_to_same_value() {
        for ms in [
            MINUTE_MS,
            7 * MINUTE_MS,
            5 * HOUR_MS,
            DAY_MS,
            3 * WEEK_MS,
            7_776_000_000,
            2 * YEAR_MS,
            400 * DAY_MS,
        ] {
            assert_eq!(parse_duration(&format_duration(ms)), ms, "ms={ms}");
        }
    }
}
