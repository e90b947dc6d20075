//! Configuration validation
//!
//! Each feature crate owns its configuration struct and implements
//! [`ConfigValidation`]. The binary aggregates them, merges environment
//! overrides, and refuses to start if any section fails.

use crate::CarepassError;
use std::fmt;

/// Configuration validation result
pub type ValidationResult = Result<(), ValidationError>;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value is required but missing
    Required { field: String },
    /// Value is out of acceptable range
    OutOfRange {
        field: String,
        min: Option<String>,
        max: Option<String>,
        actual: String,
    },
    /// Value format is invalid
    InvalidFormat {
        field: String,
        expected: String,
        actual: String,
    },
    /// Custom validation failed
    Custom { field: String, message: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required { field } => {
                write!(f, "Field '{field}' is required but missing")
            }
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "in valid range".to_string(),
                };
                write!(f, "Field '{field}' must be {range_desc} (got {actual})")
            }
            ValidationError::InvalidFormat {
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Field '{field}' has invalid format. Expected: {expected}, got: {actual}"
                )
            }
            ValidationError::Custom { field, message } => {
                write!(f, "Field '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for CarepassError {
    fn from(err: ValidationError) -> Self {
        CarepassError::invalid(err.to_string())
    }
}

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate this configuration
    fn validate(&self) -> ValidationResult;
}

/// Configuration validator that accumulates validation rules
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
    field_prefix: String,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator whose field names are prefixed with `section.`
    pub fn for_section(section: &str) -> Self {
        Self {
            errors: Vec::new(),
            field_prefix: section.to_string(),
        }
    }

    /// Validate that a string is present and non-blank
    pub fn required(&mut self, field_name: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(ValidationError::Required {
                field: self.full_field_name(field_name),
            });
        }
        self
    }

    /// Validate that a number is within an inclusive range
    pub fn range<T>(&mut self, field_name: &str, value: T, min: Option<T>, max: Option<T>) -> &mut Self
    where
        T: PartialOrd + Copy + fmt::Display,
    {
        let below = min.map(|m| value < m).unwrap_or(false);
        let above = max.map(|m| value > m).unwrap_or(false);

        if below || above {
            self.errors.push(ValidationError::OutOfRange {
                field: self.full_field_name(field_name),
                min: min.map(|m| m.to_string()),
                max: max.map(|m| m.to_string()),
                actual: value.to_string(),
            });
        }
        self
    }

    /// Validate that a string is an http(s) URL
    pub fn url(&mut self, field_name: &str, value: &str) -> &mut Self {
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            self.errors.push(ValidationError::InvalidFormat {
                field: self.full_field_name(field_name),
                expected: "url".to_string(),
                actual: value.to_string(),
            });
        }
        self
    }

    /// Validate using a custom predicate
    pub fn custom<T, F>(&mut self, field_name: &str, value: &T, predicate: F, message: &str) -> &mut Self
    where
        F: FnOnce(&T) -> bool,
    {
        if !predicate(value) {
            self.errors.push(ValidationError::Custom {
                field: self.full_field_name(field_name),
                message: message.to_string(),
            });
        }
        self
    }

    /// First recorded error, if any
    pub fn result(self) -> ValidationResult {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn full_field_name(&self, field_name: &str) -> String {
        if self.field_prefix.is_empty() {
            field_name.to_string()
        } else {
            format!("{}.{}", self.field_prefix, field_name)
        }
    }
}
