//! Scalar widening and coercion rules
//!
//! A source scalar reaches a destination scalar of another kind in one of two
//! ways. *Widening* applies when Rust offers a lossless `From` conversion
//! (`i32 → i64`, `u8 → f32`, `char → String`, ...). Everything else needs a
//! *coercion*: user-registered functions first, then the built-in set
//! (string parsing and formatting, checked integer narrowing, integral floats).
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::value::{ScalarKind, Value};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A scalar coercion function
pub type CoercionFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Whether `from` converts losslessly into `to`
pub fn is_widening(from: ScalarKind, to: ScalarKind) -> bool {
    use ScalarKind::*;
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (I8, I16 | I32 | I64 | F32 | F64)
            | (I16, I32 | I64 | F32 | F64)
            | (I32, I64 | F64)
            | (U8, U16 | U32 | U64 | I16 | I32 | I64 | F32 | F64)
            | (U16, U32 | U64 | I32 | I64 | F32 | F64)
            | (U32, U64 | I64 | F64)
            | (F32, F64)
            | (Char, String)
            | (Date, DateTime)
    )
}

/// Registry of coercions consulted when widening does not apply
#[derive(Clone, Default)]
pub struct CoercionRegistry {
    custom: HashMap<(ScalarKind, ScalarKind), CoercionFn>,
}

impl CoercionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a coercion, replacing any previous one for the same pair
    pub fn register<F>(&mut self, from: ScalarKind, to: ScalarKind, coercion: F)
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.custom.insert((from, to), Arc::new(coercion));
    }

    pub fn remove(&mut self, from: ScalarKind, to: ScalarKind) -> bool {
        self.custom.remove(&(from, to)).is_some()
    }

    pub fn len(&self) -> usize {
        self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.custom.is_empty()
    }

    /// Convert a scalar into `to`
    ///
    /// Returns `None` when no widening or coercion exists for the pair, and
    /// `Some(Err(_))` when one exists but rejected the value.
    pub fn convert(&self, value: &Value, to: ScalarKind) -> Option<Result<Value, String>> {
        let from = value.scalar_kind()?;
        if is_widening(from, to) {
            return Some(widen(value, to));
        }
        if let Some(coercion) = self.custom.get(&(from, to)) {
            return Some(coercion(value));
        }
        builtin(value, from, to)
    }
}

impl fmt::Debug for CoercionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<String> = self.custom.keys().map(|(from, to)| format!("{}->{}", from, to)).collect();
        pairs.sort();
        f.debug_struct("CoercionRegistry").field("custom", &pairs).finish()
    }
}

fn widen(value: &Value, to: ScalarKind) -> Result<Value, String> {
    match (value, to) {
        (Value::Char(c), ScalarKind::String) => Ok(Value::String(c.to_string())),
        (Value::Date(date), ScalarKind::DateTime) => Ok(Value::DateTime(start_of_day(*date))),
        _ if to.is_float() => match value.as_f64() {
            Some(number) => float_value(number, to),
            None => Ok(value.clone()),
        },
        _ => match value.as_i128() {
            Some(number) => integer_value(number, to),
            None => Ok(value.clone()),
        },
    }
}

fn builtin(value: &Value, from: ScalarKind, to: ScalarKind) -> Option<Result<Value, String>> {
    if let Value::String(text) = value {
        return parse_string(text, to);
    }
    if to == ScalarKind::String {
        return Some(Ok(Value::String(value.to_string())));
    }
    if from.is_integer() && to.is_integer() {
        return value.as_i128().map(|number| integer_value(number, to));
    }
    if from.is_integer() && to.is_float() {
        let number = value.as_i128()?;
        let approx = number as f64;
        if approx as i128 != number {
            return Some(Err(format!("{} cannot be represented exactly as {}", number, to)));
        }
        return Some(float_value(approx, to));
    }
    if from.is_float() && to.is_integer() {
        let number = value.as_f64()?;
        if !number.is_finite() || number.fract() != 0.0 {
            return Some(Err(format!("{} is not an integral value", number)));
        }
        return Some(integer_value(number as i128, to));
    }
    if from == ScalarKind::F64 && to == ScalarKind::F32 {
        let number = value.as_f64()?;
        return Some(float_value(number, to));
    }
    if let (Value::DateTime(timestamp), ScalarKind::Date) = (value, to) {
        return Some(Ok(Value::Date(timestamp.date_naive())));
    }
    None
}

fn parse_string(text: &str, to: ScalarKind) -> Option<Result<Value, String>> {
    let trimmed = text.trim();
    let parsed = match to {
        ScalarKind::Bool => match trimmed.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a boolean", text)),
        },
        ScalarKind::I8 => trimmed.parse().map(Value::I8).map_err(|e| e.to_string()),
        ScalarKind::I16 => trimmed.parse().map(Value::I16).map_err(|e| e.to_string()),
        ScalarKind::I32 => trimmed.parse().map(Value::I32).map_err(|e| e.to_string()),
        ScalarKind::I64 => trimmed.parse().map(Value::I64).map_err(|e| e.to_string()),
        ScalarKind::U8 => trimmed.parse().map(Value::U8).map_err(|e| e.to_string()),
        ScalarKind::U16 => trimmed.parse().map(Value::U16).map_err(|e| e.to_string()),
        ScalarKind::U32 => trimmed.parse().map(Value::U32).map_err(|e| e.to_string()),
        ScalarKind::U64 => trimmed.parse().map(Value::U64).map_err(|e| e.to_string()),
        ScalarKind::F32 => trimmed.parse().map(Value::F32).map_err(|e| e.to_string()),
        ScalarKind::F64 => trimmed.parse().map(Value::F64).map_err(|e| e.to_string()),
        ScalarKind::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(format!("'{}' is not a single character", text)),
            }
        }
        ScalarKind::String => Ok(Value::String(text.to_string())),
        ScalarKind::DateTime => DateTime::parse_from_rfc3339(trimmed)
            .map(|timestamp| Value::DateTime(timestamp.with_timezone(&Utc)))
            .map_err(|e| e.to_string()),
        ScalarKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| e.to_string()),
    };
    Some(parsed)
}

fn integer_value(number: i128, to: ScalarKind) -> Result<Value, String> {
    let out_of_range = || format!("{} is out of range for {}", number, to);
    let value = match to {
        ScalarKind::I8 => Value::I8(i8::try_from(number).map_err(|_| out_of_range())?),
        ScalarKind::I16 => Value::I16(i16::try_from(number).map_err(|_| out_of_range())?),
        ScalarKind::I32 => Value::I32(i32::try_from(number).map_err(|_| out_of_range())?),
        ScalarKind::I64 => Value::I64(i64::try_from(number).map_err(|_| out_of_range())?),
        ScalarKind::U8 => Value::U8(u8::try_from(number).map_err(|_| out_of_range())?),
        ScalarKind::U16 => Value::U16(u16::try_from(number).map_err(|_| out_of_range())?),
        ScalarKind::U32 => Value::U32(u32::try_from(number).map_err(|_| out_of_range())?),
        ScalarKind::U64 => Value::U64(u64::try_from(number).map_err(|_| out_of_range())?),
        other => return Err(format!("{} is not an integer kind", other)),
    };
    Ok(value)
}

fn float_value(number: f64, to: ScalarKind) -> Result<Value, String> {
    match to {
        ScalarKind::F64 => Ok(Value::F64(number)),
        ScalarKind::F32 if number.is_finite() && number.abs() > f32::MAX as f64 => {
            Err(format!("{} is out of range for f32", number))
        }
        ScalarKind::F32 => {
            let narrowed = number as f32;
            if !number.is_nan() && narrowed as f64 != number {
                return Err(format!("{} cannot be represented exactly as f32", number));
            }
            Ok(Value::F32(narrowed))
        }
        other => Err(format!("{} is not a floating point kind", other)),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(value: Value, to: ScalarKind) -> Option<Result<Value, String>> {
        CoercionRegistry::new().convert(&value, to)
    }

    #[test]
    fn test_widening_follows_lossless_from() {
        assert!(is_widening(ScalarKind::I32, ScalarKind::I64));
        assert!(is_widening(ScalarKind::U32, ScalarKind::I64));
        assert!(!is_widening(ScalarKind::I64, ScalarKind::I32));
        assert!(!is_widening(ScalarKind::I32, ScalarKind::F32));
        assert_eq!(convert(Value::I32(7), ScalarKind::I64), Some(Ok(Value::I64(7))));
        assert_eq!(convert(Value::U8(3), ScalarKind::F64), Some(Ok(Value::F64(3.0))));
        assert_eq!(convert(Value::Char('x'), ScalarKind::String), Some(Ok(Value::String("x".into()))));
    }

    #[test]
    fn test_string_parsing() {
        assert_eq!(convert(Value::String(" 42 ".into()), ScalarKind::U16), Some(Ok(Value::U16(42))));
        assert_eq!(convert(Value::String("Yes".into()), ScalarKind::Bool), Some(Ok(Value::Bool(true))));
        assert!(matches!(convert(Value::String("4x".into()), ScalarKind::I32), Some(Err(_))));
        assert_eq!(
            convert(Value::String("2024-02-29".into()), ScalarKind::Date),
            NaiveDate::from_ymd_opt(2024, 2, 29).map(|d| Ok(Value::Date(d)))
        );
    }

    #[test]
    fn test_checked_narrowing() {
        assert_eq!(convert(Value::I64(300), ScalarKind::I16), Some(Ok(Value::I16(300))));
        let err = convert(Value::I64(300), ScalarKind::U8).and_then(Result::err).expect("error");
        assert_eq!(err, "300 is out of range for u8");
        assert!(matches!(convert(Value::I32(-1), ScalarKind::U32), Some(Err(_))));
    }

    #[test]
    fn test_float_integer_coercions() {
        assert_eq!(convert(Value::F64(4.0), ScalarKind::I32), Some(Ok(Value::I32(4))));
        assert!(matches!(convert(Value::F64(4.5), ScalarKind::I32), Some(Err(_))));
        assert_eq!(convert(Value::I64(1 << 20), ScalarKind::F64), Some(Ok(Value::F64(1048576.0))));
        assert!(matches!(convert(Value::I64(i64::MAX - 1), ScalarKind::F64), Some(Err(_))));
    }

    #[test]
    fn test_narrowing_to_f32_must_be_exact() {
        assert_eq!(convert(Value::I32(16_777_216), ScalarKind::F32), Some(Ok(Value::F32(16_777_216.0))));
        let err = convert(Value::I32(16_777_217), ScalarKind::F32).and_then(Result::err).expect("error");
        assert_eq!(err, "16777217 cannot be represented exactly as f32");
        assert!(matches!(convert(Value::U64(u64::MAX), ScalarKind::F32), Some(Err(_))));

        assert_eq!(convert(Value::F64(0.5), ScalarKind::F32), Some(Ok(Value::F32(0.5))));
        assert!(matches!(convert(Value::F64(0.1), ScalarKind::F32), Some(Err(_))));
        assert!(matches!(convert(Value::F64(1e300), ScalarKind::F32), Some(Err(_))));
    }

    #[test]
    fn test_scalars_format_to_string() {
        assert_eq!(convert(Value::I32(-5), ScalarKind::String), Some(Ok(Value::String("-5".into()))));
        assert_eq!(convert(Value::Bool(true), ScalarKind::String), Some(Ok(Value::String("true".into()))));
    }

    #[test]
    fn test_no_rule_for_bool_to_number() {
        assert!(convert(Value::Bool(true), ScalarKind::I32).is_none());
        assert!(convert(Value::Null, ScalarKind::I32).is_none());
    }

    #[test]
    fn test_custom_coercion_wins_over_builtin() {
        let mut registry = CoercionRegistry::new();
        registry.register(ScalarKind::Bool, ScalarKind::I32, |value| match value {
            Value::Bool(flag) => Ok(Value::I32(*flag as i32)),
            other => Err(format!("unexpected {}", other)),
        });
        registry.register(ScalarKind::String, ScalarKind::I32, |_| Ok(Value::I32(-1)));
        assert_eq!(registry.convert(&Value::Bool(true), ScalarKind::I32), Some(Ok(Value::I32(1))));
        assert_eq!(registry.convert(&Value::String("5".into()), ScalarKind::I32), Some(Ok(Value::I32(-1))));
        assert_eq!(registry.len(), 2);
    }
}
