//! Story calendar systems.
//!
//! # Responsibility
//! - Map ordinal days (days since the calendar epoch) to calendar dates and
//!   display strings under Gregorian, fixed 360-day, or custom month systems.
//! - Convert story instants (ms on the linear story axis) to and from the
//!   ISO-like strings stored on scenes.
//!
//! # Invariants
//! - Conversions are total for every config; an empty custom month list is
//!   treated as one synthetic 30-day month.
//! - Config changes are whole-value swaps; nothing here mutates in place.

use crate::time::duration::{DAY_MS, HOUR_MS, MINUTE_MS};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const FIXED_MONTH_DAYS: i64 = 30;
const FIXED_YEAR_DAYS: i64 = 360;
const FALLBACK_MONTH_NAME: &str = "Month";
const DEFAULT_EPOCH_YEAR: i64 = 1;

const GREGORIAN_MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Supported calendar systems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarSystem {
    /// Proleptic Gregorian calendar; epoch year is ignored.
    #[default]
    Gregorian,
    /// Twelve months of thirty days each.
    Fixed360,
    /// User-defined month list.
    Custom,
}

impl CalendarSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gregorian => "gregorian",
            Self::Fixed360 => "fixed360",
            Self::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gregorian" => Some(Self::Gregorian),
            "fixed360" | "fixed_360" => Some(Self::Fixed360),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// One named month of a custom calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthConfig {
    pub name: String,
    pub days: u32,
}

impl MonthConfig {
    pub fn new(name: impl Into<String>, days: u32) -> Self {
        Self {
            name: name.into(),
            days,
        }
    }
}

/// Active story calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CalendarConfig {
    pub system: CalendarSystem,
    /// Year label of ordinal day 0 for `Fixed360` and `Custom`.
    pub epoch_year: i64,
    /// Only meaningful for `Custom`.
    #[serde(default)]
    pub months: Vec<MonthConfig>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            system: CalendarSystem::Gregorian,
            epoch_year: DEFAULT_EPOCH_YEAR,
            months: Vec::new(),
        }
    }
}

/// Calendar date with zero-based month and day indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
}

impl CalendarConfig {
    pub fn gregorian() -> Self {
        Self::default()
    }

    pub fn fixed_360(epoch_year: i64) -> Self {
        Self {
            system: CalendarSystem::Fixed360,
            epoch_year,
            months: Vec::new(),
        }
    }

    pub fn custom(epoch_year: i64, months: Vec<MonthConfig>) -> Self {
        Self {
            system: CalendarSystem::Custom,
            epoch_year,
            months,
        }
    }

    /// Returns whether switching to `other` changes how stored dates map to
    /// ordinals. Epoch-only edits relabel years but keep month structure.
    pub fn month_structure_differs(&self, other: &CalendarConfig) -> bool {
        if self.system != other.system {
            return true;
        }
        self.system == CalendarSystem::Custom
            && self.effective_months() != other.effective_months()
    }

    /// Custom months with at least one day, or one synthetic 30-day month.
    fn effective_months(&self) -> Vec<(String, i64)> {
        let months = self
            .months
            .iter()
            .filter(|month| month.days > 0)
            .map(|month| (month.name.clone(), i64::from(month.days)))
            .collect::<Vec<_>>();
        if months.is_empty() {
            vec![(FALLBACK_MONTH_NAME.to_string(), FIXED_MONTH_DAYS)]
        } else {
            months
        }
    }

    /// Converts an ordinal day to a calendar date.
    pub fn date_from_ordinal(&self, ordinal: i64) -> CalendarDate {
        match self.system {
            CalendarSystem::Gregorian => {
                let date = gregorian_from_ordinal(ordinal);
                CalendarDate {
                    year: i64::from(date.year()),
                    month: date.month0(),
                    day: date.day0(),
                }
            }
            CalendarSystem::Fixed360 => {
                let day_of_year = ordinal.rem_euclid(FIXED_YEAR_DAYS);
                CalendarDate {
                    year: self
                        .epoch_year
                        .saturating_add(ordinal.div_euclid(FIXED_YEAR_DAYS)),
                    month: (day_of_year / FIXED_MONTH_DAYS) as u32,
                    day: (day_of_year % FIXED_MONTH_DAYS) as u32,
                }
            }
            CalendarSystem::Custom => {
                let months = self.effective_months();
                let year_days: i64 = months.iter().map(|(_, days)| days).sum();
                let mut remaining = ordinal.rem_euclid(year_days);
                let mut month_index = 0;
                for (index, (_, days)) in months.iter().enumerate() {
                    if remaining < *days {
                        month_index = index;
                        break;
                    }
                    remaining -= days;
                }
                CalendarDate {
                    year: self.epoch_year.saturating_add(ordinal.div_euclid(year_days)),
                    month: month_index as u32,
                    day: remaining as u32,
                }
            }
        }
    }

    /// Converts a calendar date back to its ordinal day.
    ///
    /// Returns `None` when the month or day index does not exist, or when the
    /// ordinal does not fit in an `i64`.
    pub fn ordinal_from_date(&self, date: CalendarDate) -> Option<i64> {
        match self.system {
            CalendarSystem::Gregorian => {
                let year = i32::try_from(date.year).ok()?;
                let naive = NaiveDate::from_ymd_opt(year, date.month + 1, date.day + 1)?;
                Some((naive - unix_epoch_date()).num_days())
            }
            CalendarSystem::Fixed360 => {
                if i64::from(date.month) >= FIXED_YEAR_DAYS / FIXED_MONTH_DAYS
                    || i64::from(date.day) >= FIXED_MONTH_DAYS
                {
                    return None;
                }
                date.year
                    .checked_sub(self.epoch_year)?
                    .checked_mul(FIXED_YEAR_DAYS)?
                    .checked_add(i64::from(date.month) * FIXED_MONTH_DAYS + i64::from(date.day))
            }
            CalendarSystem::Custom => {
                let months = self.effective_months();
                let month_days = months.get(date.month as usize)?.1;
                if i64::from(date.day) >= month_days {
                    return None;
                }
                let year_days: i64 = months.iter().map(|(_, days)| days).sum();
                let before_month: i64 = months[..date.month as usize]
                    .iter()
                    .map(|(_, days)| days)
                    .sum();
                date.year
                    .checked_sub(self.epoch_year)?
                    .checked_mul(year_days)?
                    .checked_add(before_month + i64::from(date.day))
            }
        }
    }

    /// Human-readable label for an ordinal day.
    pub fn to_display(&self, ordinal: i64) -> String {
        let date = self.date_from_ordinal(ordinal);
        match self.system {
            CalendarSystem::Gregorian => format!(
                "{} {}, {}",
                GREGORIAN_MONTH_NAMES[date.month as usize % 12],
                date.day + 1,
                date.year
            ),
            CalendarSystem::Fixed360 => format!(
                "Day {} of Month {}, Year {}",
                date.day + 1,
                date.month + 1,
                date.year
            ),
            CalendarSystem::Custom => {
                let months = self.effective_months();
                let name = months
                    .get(date.month as usize)
                    .map(|(name, _)| name.as_str())
                    .unwrap_or(FALLBACK_MONTH_NAME);
                format!("{} {}, Year {}", date.day + 1, name, date.year)
            }
        }
    }

    /// Stored `YYYY-MM-DD` form of an ordinal day (one-based month and day).
    pub fn to_iso(&self, ordinal: i64) -> String {
        let date = self.date_from_ordinal(ordinal);
        iso_date(date)
    }

    /// Parses a stored ISO-like string (`YYYY-MM-DD`, optional time part) to
    /// its ordinal day.
    pub fn ordinal_from_iso(&self, text: &str) -> Option<i64> {
        self.parse_instant(text)
            .map(|instant| instant.div_euclid(DAY_MS))
    }

    /// Formats a story instant for storage on a scene.
    ///
    /// Gregorian instants are Unix epoch ms and render as RFC 3339 UTC; other
    /// systems count ms from the calendar epoch and render as
    /// `YYYY-MM-DDTHH:MM`.
    pub fn format_instant(&self, instant_ms: i64) -> String {
        if self.system == CalendarSystem::Gregorian {
            if let Some(datetime) = DateTime::<Utc>::from_timestamp_millis(instant_ms) {
                return datetime.to_rfc3339_opts(SecondsFormat::Secs, true);
            }
        }

        let ordinal = instant_ms.div_euclid(DAY_MS);
        let within_day = instant_ms.rem_euclid(DAY_MS);
        format!(
            "{}T{:02}:{:02}",
            self.to_iso(ordinal),
            within_day / HOUR_MS,
            (within_day % HOUR_MS) / MINUTE_MS
        )
    }

    /// Parses a stored date string back to a story instant in ms.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` and, for Gregorian,
    /// full RFC 3339. Returns `None` for anything else, including dates whose
    /// instant does not fit in an `i64`.
    pub fn parse_instant(&self, text: &str) -> Option<i64> {
        let trimmed = text.trim();
        if self.system == CalendarSystem::Gregorian {
            if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
                return Some(datetime.timestamp_millis());
            }
            for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                    return Some(naive.and_utc().timestamp_millis());
                }
            }
            let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()?;
            return (date - unix_epoch_date()).num_days().checked_mul(DAY_MS);
        }

        let (date_part, time_part) = match trimmed.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (trimmed, None),
        };
        let date = parse_iso_date(date_part)?;
        let ordinal = self.ordinal_from_date(date)?;
        let within_day = match time_part {
            Some(time) => parse_time_of_day(time)?,
            None => 0,
        };
        ordinal.checked_mul(DAY_MS)?.checked_add(within_day)
    }
}

fn unix_epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn gregorian_from_ordinal(ordinal: i64) -> NaiveDate {
    unix_epoch_date()
        .checked_add_signed(Duration::try_days(ordinal).unwrap_or(Duration::MAX))
        .unwrap_or(if ordinal < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        })
}

fn iso_date(date: CalendarDate) -> String {
    if date.year < 0 {
        format!(
            "-{:04}-{:02}-{:02}",
            date.year.unsigned_abs(),
            date.month + 1,
            date.day + 1
        )
    } else {
        format!("{:04}-{:02}-{:02}", date.year, date.month + 1, date.day + 1)
    }
}

fn parse_iso_date(text: &str) -> Option<CalendarDate> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut parts = body.splitn(3, '-');
    let year = parts.next()?.parse::<i64>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    if month == 0 || day == 0 {
        return None;
    }
    Some(CalendarDate {
        year: if negative { -year } else { year },
        month: month - 1,
        day: day - 1,
    })
}

fn parse_time_of_day(text: &str) -> Option<i64> {
    let text = text.trim_end_matches('Z');
    let mut parts = text.split(':');
    let hours = parts.next()?.parse::<i64>().ok()?;
    let minutes = parts.next().map_or(Some(0), |value| value.parse::<i64>().ok())?;
    let seconds = parts
        .next()
        .map_or(Some(0.0), |value| value.parse::<f64>().ok())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) || !(0.0..60.0).contains(&seconds)
    {
        return None;
    }
    Some(hours * HOUR_MS + minutes * MINUTE_MS + (seconds * 1000.0) as i64)
}
