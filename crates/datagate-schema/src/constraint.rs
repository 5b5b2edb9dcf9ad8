//! # Constraint Checkers
//!
//! A [`Constraint`] is a predicate over an already-coerced value. Checking
//! never mutates the value and never coerces it further.
//!
//! ## Semantics
//!
//! - Numeric bounds compare in the value's native ordering. A bound of a
//!   different numeric kind is widened: integer against decimal compares
//!   as decimal, anything against float compares as float.
//! - Lengths count Unicode scalar values for strings and items for lists
//!   and mappings.
//! - Patterns use the `regex` crate dialect (RE2 syntax, linear-time
//!   matching, no backreferences or look-around) with *search* semantics:
//!   `^` and `$` must be written explicitly to anchor.
//! - The null marker of an optional field satisfies every constraint.

use std::cmp::Ordering;
use std::fmt;

use datagate_core::{Decimal, FieldValue};
use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use thiserror::Error;

use crate::coerce::I64_UPPER_EXCLUSIVE;
use crate::types::{FieldType, ScalarType};

/// Pattern matched by the predefined `email` constraint.
pub const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$";

/// Tolerance for `multiple_of` on floats.
const FLOAT_MULTIPLE_EPSILON: f64 = 1e-9;

/// Numeric parameter of a bound or `multiple_of` constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
}

impl From<i64> for Limit {
    fn from(n: i64) -> Self {
        Limit::Int(n)
    }
}

impl From<i32> for Limit {
    fn from(n: i32) -> Self {
        Limit::Int(i64::from(n))
    }
}

impl From<f64> for Limit {
    fn from(x: f64) -> Self {
        Limit::Float(x)
    }
}

impl From<Decimal> for Limit {
    fn from(d: Decimal) -> Self {
        Limit::Decimal(d)
    }
}

impl Limit {
    fn is_zero(&self) -> bool {
        match self {
            Limit::Int(n) => *n == 0,
            Limit::Float(x) => *x == 0.0,
            Limit::Decimal(d) => d.is_zero(),
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Limit::Float(x) => x.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Int(n) => write!(f, "{n}"),
            Limit::Float(x) => write!(f, "{x}"),
            Limit::Decimal(d) => write!(f, "{d}"),
        }
    }
}

/// A compiled regular expression together with its source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns the `regex` compile error for invalid syntax.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A post-coercion predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Gt(Limit),
    Ge(Limit),
    Lt(Limit),
    Le(Limit),
    MultipleOf(Limit),
    MinLength(usize),
    MaxLength(usize),
    Pattern(Pattern),
    MinItems(usize),
    MaxItems(usize),
    /// The value must equal one of the listed values.
    OneOf(Vec<FieldValue>),
}

impl Constraint {
    pub fn gt(limit: impl Into<Limit>) -> Self {
        Constraint::Gt(limit.into())
    }

    pub fn ge(limit: impl Into<Limit>) -> Self {
        Constraint::Ge(limit.into())
    }

    pub fn lt(limit: impl Into<Limit>) -> Self {
        Constraint::Lt(limit.into())
    }

    pub fn le(limit: impl Into<Limit>) -> Self {
        Constraint::Le(limit.into())
    }

    pub fn multiple_of(limit: impl Into<Limit>) -> Self {
        Constraint::MultipleOf(limit.into())
    }

    pub fn min_length(n: usize) -> Self {
        Constraint::MinLength(n)
    }

    pub fn max_length(n: usize) -> Self {
        Constraint::MaxLength(n)
    }

    pub fn min_items(n: usize) -> Self {
        Constraint::MinItems(n)
    }

    pub fn max_items(n: usize) -> Self {
        Constraint::MaxItems(n)
    }

    /// A pattern constraint.
    ///
    /// # Errors
    ///
    /// Returns the `regex` compile error for invalid syntax.
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Ok(Constraint::Pattern(Pattern::new(source)?))
    }

    /// The predefined email address pattern ([`EMAIL_PATTERN`]).
    ///
    /// # Errors
    ///
    /// Propagates the `regex` compile result like [`Constraint::pattern`].
    pub fn email() -> Result<Self, regex::Error> {
        Self::pattern(EMAIL_PATTERN)
    }

    pub fn one_of<V: Into<FieldValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Constraint::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Constraint name as written in schema definitions.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Gt(_) => "gt",
            Constraint::Ge(_) => "ge",
            Constraint::Lt(_) => "lt",
            Constraint::Le(_) => "le",
            Constraint::MultipleOf(_) => "multiple_of",
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Pattern(_) => "pattern",
            Constraint::MinItems(_) => "min_items",
            Constraint::MaxItems(_) => "max_items",
            Constraint::OneOf(_) => "one_of",
        }
    }

    /// Returns true if this constraint can be evaluated against values of
    /// type `ty`. Optional wrappers are looked through.
    pub fn applies_to(&self, ty: &FieldType) -> bool {
        let base = ty.base();
        match self {
            Constraint::Gt(limit)
            | Constraint::Ge(limit)
            | Constraint::Lt(limit)
            | Constraint::Le(limit) => limit.is_finite() && is_numeric(base),
            Constraint::MultipleOf(limit) => {
                limit.is_finite() && !limit.is_zero() && is_numeric(base)
            }
            Constraint::MinLength(_) | Constraint::MaxLength(_) => matches!(
                base,
                FieldType::Scalar(ScalarType::Str) | FieldType::List(_) | FieldType::Map(_)
            ),
            Constraint::Pattern(_) => matches!(base, FieldType::Scalar(ScalarType::Str)),
            Constraint::MinItems(_) | Constraint::MaxItems(_) => {
                matches!(base, FieldType::List(_) | FieldType::Map(_))
            }
            Constraint::OneOf(values) => match base {
                FieldType::Scalar(scalar) => values.iter().all(|v| v.kind() == scalar.kind()),
                _ => false,
            },
        }
    }

    /// Evaluate this constraint against a coerced value.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] describing the violated bound.
    pub fn check(&self, value: &FieldValue) -> Result<(), ConstraintError> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Constraint::Gt(limit) => bound(value, limit, "greater_than", "greater than", |o| {
                o == Ordering::Greater
            }),
            Constraint::Ge(limit) => bound(
                value,
                limit,
                "greater_than_equal",
                "greater than or equal to",
                |o| o != Ordering::Less,
            ),
            Constraint::Lt(limit) => {
                bound(value, limit, "less_than", "less than", |o| o == Ordering::Less)
            }
            Constraint::Le(limit) => bound(
                value,
                limit,
                "less_than_equal",
                "less than or equal to",
                |o| o != Ordering::Greater,
            ),
            Constraint::MultipleOf(limit) => {
                if is_multiple(value, limit) {
                    Ok(())
                } else {
                    Err(ConstraintError::new(
                        "multiple_of",
                        format!("Input should be a multiple of {limit}"),
                    ))
                }
            }
            Constraint::MinLength(min) | Constraint::MinItems(min) => {
                let len = length(value);
                if len >= *min {
                    Ok(())
                } else {
                    Err(too_short(value, *min, len))
                }
            }
            Constraint::MaxLength(max) | Constraint::MaxItems(max) => {
                let len = length(value);
                if len <= *max {
                    Ok(())
                } else {
                    Err(too_long(value, *max, len))
                }
            }
            Constraint::Pattern(pattern) => match value {
                FieldValue::Str(s) if pattern.is_match(s) => Ok(()),
                _ => Err(ConstraintError::new(
                    "string_pattern_mismatch",
                    format!("String should match pattern '{}'", pattern.as_str()),
                )),
            },
            Constraint::OneOf(allowed) => {
                if allowed.iter().any(|a| a == value) {
                    Ok(())
                } else {
                    let listed: Vec<String> = allowed.iter().map(describe).collect();
                    Err(ConstraintError::new(
                        "enum",
                        format!("Input should be one of: {}", listed.join(", ")),
                    ))
                }
            }
        }
    }
}

/// A failed constraint check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConstraintError {
    code: &'static str,
    message: String,
}

impl ConstraintError {
    fn new(code: &'static str, message: String) -> Self {
        Self { code, message }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn is_numeric(ty: &FieldType) -> bool {
    matches!(ty, FieldType::Scalar(scalar) if scalar.is_numeric())
}

fn bound(
    value: &FieldValue,
    limit: &Limit,
    code: &'static str,
    relation: &str,
    holds: impl Fn(Ordering) -> bool,
) -> Result<(), ConstraintError> {
    match compare(value, limit) {
        Some(ordering) if holds(ordering) => Ok(()),
        _ => Err(ConstraintError::new(
            code,
            format!("Input should be {relation} {limit}"),
        )),
    }
}

/// Order `value` against `limit`, widening mixed numeric kinds.
/// `None` for incomparable values (non-numeric, NaN, unrepresentable).
fn compare(value: &FieldValue, limit: &Limit) -> Option<Ordering> {
    match (value, limit) {
        (FieldValue::Int(a), Limit::Int(b)) => Some(a.cmp(b)),
        (FieldValue::Int(a), Limit::Float(b)) => cmp_int_float(*a, *b),
        (FieldValue::Int(a), Limit::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
        (FieldValue::Float(a), Limit::Int(b)) => cmp_int_float(*b, *a).map(Ordering::reverse),
        (FieldValue::Float(a), Limit::Float(b)) => a.partial_cmp(b),
        (FieldValue::Float(a), Limit::Decimal(b)) => a.partial_cmp(&b.to_f64()?),
        (FieldValue::Decimal(a), Limit::Int(b)) => Some(a.cmp(&Decimal::from(*b))),
        (FieldValue::Decimal(a), Limit::Float(b)) => match Decimal::from_f64(*b) {
            Some(b) => Some(a.cmp(&b)),
            // Beyond the decimal range, so the f64 view of `a` is close enough.
            None => a.to_f64()?.partial_cmp(b),
        },
        (FieldValue::Decimal(a), Limit::Decimal(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Exact order of an integer against a float, with no rounding of `a`.
fn cmp_int_float(a: i64, b: f64) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    if b >= I64_UPPER_EXCLUSIVE {
        return Some(Ordering::Less);
    }
    if b < -I64_UPPER_EXCLUSIVE {
        return Some(Ordering::Greater);
    }
    // |b| < 2^63 here, so its integral part fits an i64 exactly.
    let whole = b.trunc();
    Some(a.cmp(&(whole as i64)).then_with(|| {
        if b > whole {
            Ordering::Less
        } else if b < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }))
}

fn is_multiple(value: &FieldValue, limit: &Limit) -> bool {
    if limit.is_zero() {
        return false;
    }
    match (value, limit) {
        (FieldValue::Int(a), Limit::Int(b)) => a.checked_rem(*b) == Some(0),
        (FieldValue::Decimal(_), _) | (FieldValue::Int(_), Limit::Decimal(_)) => {
            match (as_decimal(value), limit_decimal(limit)) {
                (Some(a), Some(b)) => a.checked_rem(b).is_some_and(|r| r.is_zero()),
                _ => false,
            }
        }
        _ => match (as_f64(value), limit_f64(limit)) {
            (Some(a), Some(b)) => {
                let r = (a % b).abs();
                r < FLOAT_MULTIPLE_EPSILON || (b.abs() - r) < FLOAT_MULTIPLE_EPSILON
            }
            _ => false,
        },
    }
}

fn as_decimal(value: &FieldValue) -> Option<Decimal> {
    match value {
        FieldValue::Int(n) => Some(Decimal::from(*n)),
        FieldValue::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn limit_decimal(limit: &Limit) -> Option<Decimal> {
    match limit {
        Limit::Int(n) => Some(Decimal::from(*n)),
        Limit::Decimal(d) => Some(*d),
        Limit::Float(x) => Decimal::from_f64(*x),
    }
}

fn as_f64(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Int(n) => Some(*n as f64),
        FieldValue::Float(x) => Some(*x),
        FieldValue::Decimal(d) => d.to_f64(),
        _ => None,
    }
}

fn limit_f64(limit: &Limit) -> Option<f64> {
    match limit {
        Limit::Int(n) => Some(*n as f64),
        Limit::Float(x) => Some(*x),
        Limit::Decimal(d) => d.to_f64(),
    }
}

fn length(value: &FieldValue) -> usize {
    match value {
        FieldValue::Str(s) => s.chars().count(),
        FieldValue::List(items) => items.len(),
        FieldValue::Map(entries) => entries.len(),
        _ => 0,
    }
}

fn too_short(value: &FieldValue, min: usize, actual: usize) -> ConstraintError {
    match value {
        FieldValue::Str(_) => ConstraintError::new(
            "string_too_short",
            format!("String should have at least {min} character(s)"),
        ),
        _ => ConstraintError::new(
            "too_short",
            format!(
                "{} should have at least {min} item(s) after validation, not {actual}",
                collection_noun(value)
            ),
        ),
    }
}

fn too_long(value: &FieldValue, max: usize, actual: usize) -> ConstraintError {
    match value {
        FieldValue::Str(_) => ConstraintError::new(
            "string_too_long",
            format!("String should have at most {max} character(s)"),
        ),
        _ => ConstraintError::new(
            "too_long",
            format!(
                "{} should have at most {max} item(s) after validation, not {actual}",
                collection_noun(value)
            ),
        ),
    }
}

fn collection_noun(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Map(_) => "Mapping",
        _ => "List",
    }
}

fn describe(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) => format!("'{s}'"),
        FieldValue::Int(n) => n.to_string(),
        FieldValue::Float(x) => x.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Decimal(d) => d.to_string(),
        FieldValue::Timestamp(ts) => ts.to_string(),
        other => other.kind().name().to_string(),
    }
}
