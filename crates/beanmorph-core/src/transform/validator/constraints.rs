//! Field constraints and the violations they report
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::value::Value;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declarative constraint attached to a property
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Value must not be null (`None`)
    NotNull,
    /// String must contain a non-whitespace character
    NotBlank,
    /// Length bounds for strings (in chars), lists and maps
    Size { min: Option<usize>, max: Option<usize> },
    /// Inclusive numeric bounds
    Range { min: Option<f64>, max: Option<f64> },
    /// String must match the whole pattern
    Pattern { source: String, regex: Regex },
}

impl Constraint {
    /// Build a [`Constraint::Pattern`] matching the entire string
    pub fn pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| Error::InvalidArgument {
            message: format!("invalid pattern '{}': {}", pattern, e),
        })?;
        Ok(Constraint::Pattern {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn size(min: Option<usize>, max: Option<usize>) -> Self {
        Constraint::Size { min, max }
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Constraint::Range { min, max }
    }

    /// Check a value, returning the violation message if it fails
    ///
    /// Null values only fail `NotNull` and `NotBlank`; the other constraints
    /// treat absence as valid.
    pub fn check(&self, value: &Value) -> Option<String> {
        match self {
            Constraint::NotNull => value.is_null().then(|| "must not be null".to_string()),
            Constraint::NotBlank => match value {
                Value::Null => Some("must not be blank".to_string()),
                Value::String(s) if s.trim().is_empty() => Some("must not be blank".to_string()),
                _ => None,
            },
            Constraint::Size { min, max } => {
                let len = match value {
                    Value::String(s) => s.chars().count(),
                    Value::List(items) => items.len(),
                    Value::Map(entries) => entries.len(),
                    _ => return None,
                };
                let below = min.map_or(false, |min| len < min);
                let above = max.map_or(false, |max| len > max);
                (below || above).then(|| format!("size must be {} (was {})", describe_bounds(min, max), len))
            }
            Constraint::Range { min, max } => {
                let number = value.as_f64()?;
                let below = min.map_or(false, |min| number < min);
                let above = max.map_or(false, |max| number > max);
                (below || above).then(|| format!("must be {} (was {})", describe_bounds(min, max), number))
            }
            Constraint::Pattern { source, regex } => match value {
                Value::String(s) if !regex.is_match(s) => Some(format!("must match \"{}\"", source)),
                _ => None,
            },
        }
    }
}

fn describe_bounds<T: fmt::Display>(min: &Option<T>, max: &Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("between {} and {}", min, max),
        (Some(min), None) => format!("at least {}", min),
        (None, Some(max)) => format!("at most {}", max),
        (None, None) => "unbounded".to_string(),
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::NotNull => write!(f, "NotNull"),
            Constraint::NotBlank => write!(f, "NotBlank"),
            Constraint::Size { .. } => write!(f, "Size"),
            Constraint::Range { .. } => write!(f, "Range"),
            Constraint::Pattern { .. } => write!(f, "Pattern"),
        }
    }
}

/// One failed constraint on a built instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Dotted path of the offending field from the validated root
    pub path: String,
    /// Name of the failed constraint
    pub constraint: String,
    pub message: String,
    /// Rendered offending value
    pub value: Option<String>,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_null_and_blank() {
        assert!(Constraint::NotNull.check(&Value::Null).is_some());
        assert!(Constraint::NotNull.check(&Value::I32(0)).is_none());
        assert!(Constraint::NotBlank.check(&Value::String("  ".into())).is_some());
        assert!(Constraint::NotBlank.check(&Value::String("a".into())).is_none());
    }

    #[test]
    fn test_size_counts_chars_and_items() {
        let size = Constraint::size(Some(2), Some(3));
        assert!(size.check(&Value::String("é".into())).is_some());
        assert!(size.check(&Value::String("éé".into())).is_none());
        assert!(size.check(&Value::List(vec![Value::Null; 4])).is_some());
        assert!(size.check(&Value::Null).is_none());
    }

    #[test]
    fn test_range_message() {
        let range = Constraint::range(Some(0.0), Some(10.0));
        let message = range.check(&Value::I64(11)).expect("violation");
        assert_eq!(message, "must be between 0 and 10 (was 11)");
        assert!(range.check(&Value::U8(10)).is_none());
    }

    #[test]
    fn test_pattern_is_anchored() {
        let pattern = Constraint::pattern("[A-Z][0-9]").expect("valid pattern");
        assert!(pattern.check(&Value::String("X1".into())).is_none());
        assert!(pattern.check(&Value::String("xX1".into())).is_some());
        assert!(Constraint::pattern("(").is_err());
    }
}
