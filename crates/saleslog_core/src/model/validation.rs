//! Field-level validation shared by all entity models.
//!
//! Limits mirror the column sizes of the original sales schema. Lengths are
//! counted in Unicode scalar values, not bytes.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Integer and fraction digits available in a `decimal(18,2)` column.
const DECIMAL_18_2_INTEGER_DIGITS: u32 = 16;
const DECIMAL_18_2_SCALE: u32 = 2;

/// Timestamps are persisted as epoch milliseconds.
const NANOS_PER_MILLI: u32 = 1_000_000;

/// Validation error raised before a write reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} exceeds {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    #[error("{field} is not a valid email address: `{value}`")]
    InvalidEmail { field: &'static str, value: String },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
    #[error("{field} must reference a positive id (got {value})")]
    InvalidReference { field: &'static str, value: i64 },
    #[error("{field} does not fit decimal(18,2): {value}")]
    DecimalOutOfRange { field: &'static str, value: String },
    #[error("{field} has sub-millisecond precision: {value}")]
    SubMillisecond { field: &'static str, value: String },
}

pub type ValidationResult = Result<(), ValidationError>;

/// Requires a non-blank value.
pub fn required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Requires a non-blank value of at most `max` characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> ValidationResult {
    required(field, value)?;
    max_length(field, value, max)
}

/// Checks the length of an optional value.
pub fn optional_text(field: &'static str, value: Option<&str>, max: usize) -> ValidationResult {
    match value {
        Some(value) => max_length(field, value, max),
        None => Ok(()),
    }
}

pub fn max_length(field: &'static str, value: &str, max: usize) -> ValidationResult {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

/// Requires a non-blank, email-shaped value of at most `max` characters.
pub fn required_email(field: &'static str, value: &str, max: usize) -> ValidationResult {
    required_text(field, value, max)?;
    email_shape(field, value)
}

/// Checks an optional email; blank values are accepted as "not provided".
pub fn optional_email(field: &'static str, value: Option<&str>, max: usize) -> ValidationResult {
    match value {
        Some(value) if !value.trim().is_empty() => {
            max_length(field, value, max)?;
            email_shape(field, value)
        }
        Some(value) => max_length(field, value, max),
        None => Ok(()),
    }
}

fn email_shape(field: &'static str, value: &str) -> ValidationResult {
    if EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail {
            field,
            value: value.to_string(),
        })
    }
}

pub fn non_negative(field: &'static str, value: Option<i64>) -> ValidationResult {
    match value {
        Some(value) if value < 0 => Err(ValidationError::Negative { field, value }),
        _ => Ok(()),
    }
}

pub fn reference(field: &'static str, value: i64) -> ValidationResult {
    if value <= 0 {
        return Err(ValidationError::InvalidReference { field, value });
    }
    Ok(())
}

pub fn optional_reference(field: &'static str, value: Option<i64>) -> ValidationResult {
    match value {
        Some(value) => reference(field, value),
        None => Ok(()),
    }
}

/// Requires the value to fit `decimal(18,2)`.
pub fn decimal_18_2(field: &'static str, value: Option<&Decimal>) -> ValidationResult {
    let Some(value) = value else {
        return Ok(());
    };

    let limit = Decimal::from_i128_with_scale(10_i128.pow(DECIMAL_18_2_INTEGER_DIGITS), 0);
    if value.normalize().scale() > DECIMAL_18_2_SCALE || value.abs() >= limit {
        return Err(ValidationError::DecimalOutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Requires a caller-supplied timestamp to be representable in milliseconds.
pub fn millisecond_timestamp(field: &'static str, value: &DateTime<Utc>) -> ValidationResult {
    if value.timestamp_subsec_nanos() % NANOS_PER_MILLI != 0 {
        return Err(ValidationError::SubMillisecond {
            field,
            value: value.to_rfc3339(),
        });
    }
    Ok(())
}

pub fn optional_millisecond_timestamp(
    field: &'static str,
    value: Option<&DateTime<Utc>>,
) -> ValidationResult {
    match value {
        Some(value) => millisecond_timestamp(field, value),
        None => Ok(()),
    }
}
