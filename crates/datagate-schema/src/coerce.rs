//! # Type Coercers
//!
//! Pure functions from an untyped `serde_json::Value` to a scalar
//! [`FieldValue`]. Compound types (lists, mappings, nested schemas) are
//! walked by the validation engine, which calls into this module for each
//! scalar leaf.
//!
//! ## Policy
//!
//! | Target | Lax accepts | Strict accepts |
//! |--------|-------------|----------------|
//! | integer | i64-range integers; floats with no fractional part; strings of an optional sign and digits | i64-range integers |
//! | float | finite numbers; finite numeric strings | numbers |
//! | boolean | booleans; `"true"`/`"false"` in any case; integers `0` and `1` | booleans |
//! | string | strings | strings |
//! | decimal | numbers; decimal literal strings | decimal literal strings |
//! | timestamp | RFC 3339 and the naive layouts of [`Timestamp::parse_lenient`]; integer Unix seconds | RFC 3339 strings |
//!
//! Booleans are never numbers, in either mode. Strings are never trimmed
//! before numeric parsing: `" 42"` is not an integer. Any other input fails
//! with a type error rather than a guess.

use std::str::FromStr;

use datagate_core::{Decimal, FieldValue, Timestamp, TimestampError};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::types::ScalarType;

/// Smallest f64 strictly above the i64 range (2^63).
pub(crate) const I64_UPPER_EXCLUSIVE: f64 = 9_223_372_036_854_775_808.0;

/// How a single value is coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoerceMode {
    /// Require the decoded input type to match the target exactly.
    pub strict: bool,
    /// Trim surrounding whitespace from string targets.
    pub strip_whitespace: bool,
}

impl CoerceMode {
    pub fn lax() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            strip_whitespace: false,
        }
    }
}

/// Why a raw value could not be converted to its target type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    #[error("Input should be a valid {expected}")]
    WrongType { expected: ScalarType },

    #[error("Input should be a valid integer, unable to parse string as an integer")]
    IntParsing,

    #[error("Input should be a valid integer, got a number with a fractional part")]
    IntFromFloat,

    #[error("Input should be a valid integer, value is out of range for a 64-bit integer")]
    IntOverflow,

    #[error("Input should be a valid number, unable to parse string as a number")]
    FloatParsing,

    #[error("Input should be a finite number")]
    FiniteNumber,

    #[error("Input should be a valid boolean, unable to interpret input")]
    BoolParsing,

    #[error("Input should be a valid decimal")]
    DecimalParsing,

    #[error("Input should be a valid timestamp, {0}")]
    TimestampParsing(String),

    #[error("Input should be a valid list")]
    ListType,

    #[error("Input should be a valid mapping")]
    MapType,
}

impl CoercionError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CoercionError::WrongType { expected } => match expected {
                ScalarType::Int => "int_type",
                ScalarType::Float => "float_type",
                ScalarType::Bool => "bool_type",
                ScalarType::Str => "string_type",
                ScalarType::Decimal => "decimal_type",
                ScalarType::Timestamp => "datetime_type",
            },
            CoercionError::IntParsing => "int_parsing",
            CoercionError::IntFromFloat => "int_from_float",
            CoercionError::IntOverflow => "int_parsing_size",
            CoercionError::FloatParsing => "float_parsing",
            CoercionError::FiniteNumber => "finite_number",
            CoercionError::BoolParsing => "bool_parsing",
            CoercionError::DecimalParsing => "decimal_parsing",
            CoercionError::TimestampParsing(_) => "datetime_parsing",
            CoercionError::ListType => "list_type",
            CoercionError::MapType => "dict_type",
        }
    }
}

impl From<TimestampError> for CoercionError {
    fn from(err: TimestampError) -> Self {
        match err {
            TimestampError::Invalid { reason, .. } => CoercionError::TimestampParsing(reason),
            TimestampError::OutOfRange(secs) => {
                CoercionError::TimestampParsing(format!("unix time {secs} is out of range"))
            }
        }
    }
}

/// Coerce `raw` to the scalar type `target`.
///
/// # Errors
///
/// Returns a [`CoercionError`] when `raw` has no acceptable representation
/// of `target` under `mode`.
pub fn coerce(target: ScalarType, raw: &Value, mode: CoerceMode) -> Result<FieldValue, CoercionError> {
    match target {
        ScalarType::Int => coerce_int(raw, mode.strict).map(FieldValue::Int),
        ScalarType::Float => coerce_float(raw, mode.strict).map(FieldValue::Float),
        ScalarType::Bool => coerce_bool(raw, mode.strict).map(FieldValue::Bool),
        ScalarType::Str => coerce_str(raw, mode.strip_whitespace).map(FieldValue::Str),
        ScalarType::Decimal => coerce_decimal(raw, mode.strict).map(FieldValue::Decimal),
        ScalarType::Timestamp => coerce_timestamp(raw, mode.strict).map(FieldValue::Timestamp),
    }
}

fn wrong(expected: ScalarType) -> CoercionError {
    CoercionError::WrongType { expected }
}

fn coerce_int(raw: &Value, strict: bool) -> Result<i64, CoercionError> {
    match raw {
        Value::Number(n) => int_from_number(n, strict),
        Value::String(s) if !strict => parse_int_literal(s),
        _ => Err(wrong(ScalarType::Int)),
    }
}

fn int_from_number(n: &Number, strict: bool) -> Result<i64, CoercionError> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    if n.is_u64() {
        return Err(CoercionError::IntOverflow);
    }
    if strict {
        return Err(wrong(ScalarType::Int));
    }
    let x = n.as_f64().ok_or(CoercionError::FiniteNumber)?;
    if !x.is_finite() {
        return Err(CoercionError::FiniteNumber);
    }
    if x.fract() != 0.0 {
        return Err(CoercionError::IntFromFloat);
    }
    if x < -I64_UPPER_EXCLUSIVE || x >= I64_UPPER_EXCLUSIVE {
        return Err(CoercionError::IntOverflow);
    }
    Ok(x as i64)
}

/// An optional sign followed by one or more ASCII digits, nothing else.
fn parse_int_literal(s: &str) -> Result<i64, CoercionError> {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoercionError::IntParsing);
    }
    s.parse::<i64>().map_err(|_| CoercionError::IntOverflow)
}

fn coerce_float(raw: &Value, strict: bool) -> Result<f64, CoercionError> {
    match raw {
        Value::Number(n) => {
            let x = n.as_f64().ok_or(CoercionError::FiniteNumber)?;
            if x.is_finite() {
                Ok(x)
            } else {
                Err(CoercionError::FiniteNumber)
            }
        }
        Value::String(s) if !strict => {
            let x = s.parse::<f64>().map_err(|_| CoercionError::FloatParsing)?;
            if x.is_finite() {
                Ok(x)
            } else {
                Err(CoercionError::FiniteNumber)
            }
        }
        _ => Err(wrong(ScalarType::Float)),
    }
}

fn coerce_bool(raw: &Value, strict: bool) -> Result<bool, CoercionError> {
    match raw {
        Value::Bool(b) => Ok(*b),
        _ if strict => Err(wrong(ScalarType::Bool)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        Value::String(_) => Err(CoercionError::BoolParsing),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(CoercionError::BoolParsing),
        },
        _ => Err(wrong(ScalarType::Bool)),
    }
}

fn coerce_str(raw: &Value, strip_whitespace: bool) -> Result<String, CoercionError> {
    match raw {
        Value::String(s) if strip_whitespace => Ok(s.trim().to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(wrong(ScalarType::Str)),
    }
}

fn coerce_decimal(raw: &Value, strict: bool) -> Result<Decimal, CoercionError> {
    match raw {
        Value::String(s) => parse_decimal_literal(s),
        Value::Number(n) if !strict => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|_| CoercionError::DecimalParsing)
        }
        _ => Err(wrong(ScalarType::Decimal)),
    }
}

/// Optional sign, digits, optional fractional part; at least one digit.
fn parse_decimal_literal(s: &str) -> Result<Decimal, CoercionError> {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let well_formed = !(int_part.is_empty() && frac_part.is_empty())
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(CoercionError::DecimalParsing);
    }
    Decimal::from_str(s).map_err(|_| CoercionError::DecimalParsing)
}

fn coerce_timestamp(raw: &Value, strict: bool) -> Result<Timestamp, CoercionError> {
    match raw {
        Value::String(s) if strict => Ok(Timestamp::parse(s)?),
        Value::String(s) => Ok(Timestamp::parse_lenient(s)?),
        Value::Number(n) if !strict => match n.as_i64() {
            Some(secs) => Ok(Timestamp::from_epoch_secs(secs)?),
            None => Err(wrong(ScalarType::Timestamp)),
        },
        _ => Err(wrong(ScalarType::Timestamp)),
    }
}
