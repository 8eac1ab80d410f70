//! Input validation rules shared by domain models.
//!
//! # Invariants
//! - Validators return trimmed, owned values on success.
//! - Errors carry the public field name that failed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Length bounds for organisation-style display names.
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;

static ENTITY_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s\-.,&]+$").ok());
static EMAIL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Validation error for one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Blank {
        field: &'static str,
    },
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },
    InvalidCharacters {
        field: &'static str,
    },
    InvalidEmail {
        field: &'static str,
    },
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    InvalidAmount {
        field: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be blank"),
            Self::Length { field, min, max } => {
                write!(f, "{field} must be between {min} and {max} characters")
            }
            Self::InvalidCharacters { field } => write!(
                f,
                "{field} may only contain letters, digits, spaces and - . , &"
            ),
            Self::InvalidEmail { field } => write!(f, "{field} must be a valid email address"),
            Self::OutOfRange {
                field,
                min,
                max,
                value,
            } => write!(f, "{field} must be between {min} and {max}, got {value}"),
            Self::InvalidAmount { field } => write!(
                f,
                "{field} must be a non-negative number with up to 2 decimal places"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Requires non-blank text.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    Ok(trimmed.to_string())
}

/// Trims optional text; blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Validates a funder/stakeholder style name.
pub fn entity_name(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = require_text(field, value)?;
    let chars = trimmed.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&chars) {
        return Err(ValidationError::Length {
            field,
            min: NAME_MIN_CHARS,
            max: NAME_MAX_CHARS,
        });
    }
    let allowed = ENTITY_NAME
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(&trimmed));
    if !allowed {
        return Err(ValidationError::InvalidCharacters { field });
    }
    Ok(trimmed)
}

/// Requires non-blank text of `min..=max` characters.
pub fn bounded_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = require_text(field, value)?;
    if !(min..=max).contains(&trimmed.chars().count()) {
        return Err(ValidationError::Length { field, min, max });
    }
    Ok(trimmed)
}

/// Trims optional text and caps it at `max` characters; blank becomes `None`.
pub fn optional_bounded_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match optional_text(value) {
        Some(text) if text.chars().count() > max => {
            Err(ValidationError::Length { field, min: 0, max })
        }
        other => Ok(other),
    }
}

/// Validates an email address and lowercases it.
pub fn email(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = require_text(field, value)?;
    let valid = EMAIL
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(&trimmed));
    if !valid {
        return Err(ValidationError::InvalidEmail { field });
    }
    Ok(trimmed.to_lowercase())
}

/// Validates an optional email; blank becomes `None`.
pub fn optional_email(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    optional_text(value)
        .map(|text| email(field, &text))
        .transpose()
}

/// Requires `min <= value <= max`.
pub fn in_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<i64, ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(value)
}

/// Money value stored as whole cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Decimal value for display and serialization.
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parses a non-negative decimal with at most two fractional digits.
    pub fn from_decimal(field: &'static str, value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidAmount { field });
        }
        let scaled = value * 100.0;
        let cents = scaled.round();
        if (scaled - cents).abs() > 1e-6 || cents >= i64::MAX as f64 {
            return Err(ValidationError::InvalidAmount { field });
        }
        Ok(Self(cents as i64))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

/// Validates an optional decimal amount.
pub fn optional_amount(
    field: &'static str,
    value: Option<f64>,
) -> Result<Option<Amount>, ValidationError> {
    value
        .map(|value| Amount::from_decimal(field, value))
        .transpose()
}
