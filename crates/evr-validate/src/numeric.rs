//! Numeric cell parsing for integer and decimal fields.
//!
//! Cells are plain base-10 numeric strings: an optional sign, digits, and
//! for decimals an optional fractional part. Exponents, thousands
//! separators, and currency symbols are rejected.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    Empty,
    NotAnInteger(String),
    NotADecimal(String),
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty numeric value"),
            Self::NotAnInteger(value) => write!(f, "{value:?} is not an integer"),
            Self::NotADecimal(value) => write!(f, "{value:?} is not a decimal number"),
        }
    }
}

impl std::error::Error for NumericError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedInteger {
    pub value: i64,
    /// Digit count excluding any sign, with leading zeros kept: fixed-width
    /// codes like zip prefixes are compared on the written width.
    pub digits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedDecimal {
    pub value: f64,
    /// Significant integer digits (leading zeros stripped, minimum one).
    pub integer_digits: u32,
    /// Written fractional digits.
    pub fraction_digits: u32,
}

impl ParsedDecimal {
    /// Total digits after assuming trailing zeros out to `max_scale`: a
    /// value written with fewer fractional digits than the scale occupies
    /// the padded width in the durable store.
    pub fn effective_precision(&self, max_scale: u32) -> u32 {
        self.integer_digits + self.fraction_digits.max(max_scale)
    }
}

pub fn parse_integer(value: &str) -> Result<ParsedInteger, NumericError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NumericError::Empty);
    }

    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(NumericError::NotAnInteger(trimmed.to_string()));
    }

    let value = trimmed
        .parse::<i64>()
        .map_err(|_| NumericError::NotAnInteger(trimmed.to_string()))?;
    Ok(ParsedInteger {
        value,
        digits: digits.len() as u32,
    })
}

pub fn parse_decimal(value: &str) -> Result<ParsedDecimal, NumericError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NumericError::Empty);
    }

    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let (integer_part, fraction_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };

    // "1." and ".5" are rejected; cells are written with explicit digits on
    // both sides of the point or with no point at all.
    if integer_part.is_empty()
        || !integer_part.chars().all(|c| c.is_ascii_digit())
        || (unsigned.contains('.') && fraction_part.is_empty())
        || !fraction_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(NumericError::NotADecimal(trimmed.to_string()));
    }

    let value = trimmed
        .parse::<f64>()
        .map_err(|_| NumericError::NotADecimal(trimmed.to_string()))?;

    let significant = integer_part.trim_start_matches('0');
    let integer_digits = if significant.is_empty() {
        1
    } else {
        significant.len() as u32
    };

    Ok(ParsedDecimal {
        value,
        integer_digits,
        fraction_digits: fraction_part.len() as u32,
    })
}
