//! The fixed ISO 8601 timestamp profile accepted in submission cells.
//!
//! Accepted: `YYYY-MM-DDThh:mm:ss`, optionally followed by a fractional
//! second part and/or a trailing `Z`.
//!
//! Everything else is rejected, including forms that are valid ISO 8601 but
//! outside the profile: bare dates, week dates (`2024-W05-1`), ordinal
//! dates, space-separated date/time, and explicit numeric offsets
//! (`+02:00`). Submitters localize to UTC before upload; the profile keeps
//! stored timestamps comparable as plain strings.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatetimeError {
    /// Bare date or otherwise missing the `T` time designator.
    MissingTime,
    /// Space-separated date/time is valid ISO 8601 but outside the profile.
    SpaceSeparatorNotAllowed,
    /// Week-date form (`YYYY-Www-D`) is outside the profile.
    WeekDateNotAllowed,
    /// Explicit numeric UTC offsets are outside the profile; only `Z` is
    /// accepted.
    OffsetNotAllowed,
    InvalidDate(String),
    InvalidTime(String),
    InvalidFraction(String),
    TrailingInput(String),
}

impl fmt::Display for DatetimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTime => {
                write!(f, "timestamp must include a time part (YYYY-MM-DDThh:mm:ss)")
            }
            Self::SpaceSeparatorNotAllowed => {
                write!(f, "date and time must be separated by 'T', not a space")
            }
            Self::WeekDateNotAllowed => write!(f, "ISO week dates are not accepted"),
            Self::OffsetNotAllowed => {
                write!(f, "explicit UTC offsets are not accepted; use 'Z' or omit")
            }
            Self::InvalidDate(part) => write!(f, "invalid date component: {part}"),
            Self::InvalidTime(part) => write!(f, "invalid time component: {part}"),
            Self::InvalidFraction(part) => write!(f, "invalid fractional seconds: {part}"),
            Self::TrailingInput(rest) => write!(f, "unexpected trailing input: {rest}"),
        }
    }
}

impl std::error::Error for DatetimeError {}

/// Parse a cell against the profile. The returned value is naive; a trailing
/// `Z` only marks the timestamp as UTC, it carries no offset arithmetic.
pub fn parse_profile_datetime(value: &str) -> Result<NaiveDateTime, DatetimeError> {
    let trimmed = value.trim();

    if trimmed.contains(' ') {
        return Err(DatetimeError::SpaceSeparatorNotAllowed);
    }
    if trimmed.contains('W') || trimmed.contains('w') {
        return Err(DatetimeError::WeekDateNotAllowed);
    }

    let (date_part, time_part) = match trimmed.split_once('T') {
        Some(parts) => parts,
        None => return Err(DatetimeError::MissingTime),
    };

    let date = parse_date_part(date_part)?;
    let time = parse_time_part(time_part)?;
    Ok(NaiveDateTime::new(date, time))
}

/// Date prefix of a profile timestamp, for rules that only reason in days.
pub fn parse_profile_date(value: &str) -> Result<NaiveDate, DatetimeError> {
    parse_profile_datetime(value).map(|dt| dt.date())
}

fn parse_date_part(date_part: &str) -> Result<NaiveDate, DatetimeError> {
    // Strict YYYY-MM-DD: two dashes, four/two/two digits. chrono's parser
    // would accept shorter years, so shape-check first.
    let segments: Vec<&str> = date_part.split('-').collect();
    if segments.len() != 3
        || segments[0].len() != 4
        || segments[1].len() != 2
        || segments[2].len() != 2
        || !segments.iter().all(|s| s.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(DatetimeError::InvalidDate(date_part.to_string()));
    }

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| DatetimeError::InvalidDate(date_part.to_string()))
}

fn parse_time_part(time_part: &str) -> Result<NaiveTime, DatetimeError> {
    let without_zulu = match time_part.strip_suffix(['Z', 'z']) {
        Some(rest) => rest,
        None => time_part,
    };

    if without_zulu.contains('+') || without_zulu.contains('-') {
        return Err(DatetimeError::OffsetNotAllowed);
    }

    let (clock, fraction) = match without_zulu.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (without_zulu, None),
    };

    let segments: Vec<&str> = clock.split(':').collect();
    if segments.len() != 3
        || !segments.iter().all(|s| s.len() == 2)
        || !segments.iter().all(|s| s.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(DatetimeError::InvalidTime(time_part.to_string()));
    }

    let hour: u32 = segments[0]
        .parse()
        .map_err(|_| DatetimeError::InvalidTime(time_part.to_string()))?;
    let minute: u32 = segments[1]
        .parse()
        .map_err(|_| DatetimeError::InvalidTime(time_part.to_string()))?;
    let second: u32 = segments[2]
        .parse()
        .map_err(|_| DatetimeError::InvalidTime(time_part.to_string()))?;

    let nanos = match fraction {
        None => 0,
        Some(fraction) => {
            if fraction.is_empty()
                || fraction.len() > 9
                || !fraction.chars().all(|c| c.is_ascii_digit())
            {
                return Err(DatetimeError::InvalidFraction(fraction.to_string()));
            }
            let padded = format!("{fraction:0<9}");
            padded
                .parse::<u32>()
                .map_err(|_| DatetimeError::InvalidFraction(fraction.to_string()))?
        }
    };

    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(|| DatetimeError::InvalidTime(time_part.to_string()))
}
