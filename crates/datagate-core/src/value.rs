//! # Typed Field Values
//!
//! [`FieldValue`] is what a field holds after validation: one variant per
//! declared field type. [`Record`] is an ordered set of named field values
//! plus the provenance needed by partial-update projections (which fields
//! the caller actually supplied, as opposed to defaults).
//!
//! ## Invariants
//!
//! - A `Record` never holds two fields with the same name.
//! - Field order is insertion order, which the validation engine makes equal
//!   to schema declaration order.
//! - `fields_set` only ever names fields present in the record.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;

use crate::temporal::Timestamp;

/// The coarse kind of a [`FieldValue`], used for type checks and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Decimal,
    Timestamp,
    List,
    Map,
    Model,
}

impl ValueKind {
    /// Human-readable kind name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::Decimal => "decimal",
            ValueKind::Timestamp => "timestamp",
            ValueKind::List => "list",
            ValueKind::Map => "mapping",
            ValueKind::Model => "model",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated, strongly-typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The null/absent marker of an optional field.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Decimal(Decimal),
    Timestamp(Timestamp),
    /// Ordered sequence of element values.
    List(Vec<FieldValue>),
    /// String-keyed mapping, in input key order.
    Map(Vec<(String, FieldValue)>),
    /// A nested validated record.
    Model(Record),
}

impl FieldValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Null => ValueKind::Null,
            FieldValue::Bool(_) => ValueKind::Bool,
            FieldValue::Int(_) => ValueKind::Int,
            FieldValue::Float(_) => ValueKind::Float,
            FieldValue::Str(_) => ValueKind::Str,
            FieldValue::Decimal(_) => ValueKind::Decimal,
            FieldValue::Timestamp(_) => ValueKind::Timestamp,
            FieldValue::List(_) => ValueKind::List,
            FieldValue::Map(_) => ValueKind::Map,
            FieldValue::Model(_) => ValueKind::Model,
        }
    }

    /// Structural equality that ignores record provenance.
    pub fn values_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Model(a), FieldValue::Model(b)) => a.values_eq(b),
            (FieldValue::List(a), FieldValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.values_eq(y))
            }
            (FieldValue::Map(a), FieldValue::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ak, av), (bk, bv))| ak == bk && av.values_eq(bv))
            }
            (a, b) => a == b,
        }
    }

    /// Returns true for the null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            FieldValue::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, FieldValue)]> {
        match self {
            FieldValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Model(record) => Some(record),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<Decimal> for FieldValue {
    fn from(d: Decimal) -> Self {
        FieldValue::Decimal(d)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(ts: Timestamp) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// An ordered, named set of validated field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
    fields_set: BTreeSet<String>,
}

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, or replace the value of an existing one in place.
    ///
    /// `explicit` records whether the value came from the caller's input
    /// (as opposed to a default).
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue, explicit: bool) {
        let name = name.into();
        if explicit {
            self.fields_set.insert(name.clone());
        } else {
            self.fields_set.remove(&name);
        }
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Replace the value of an existing field without touching provenance.
    ///
    /// Returns the previous value, or `None` (and changes nothing) if the
    /// record has no such field.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Option<FieldValue> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| std::mem::replace(slot, value))
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns true if the record has a field with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fields in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Names of the fields that were explicitly supplied.
    pub fn fields_set(&self) -> &BTreeSet<String> {
        &self.fields_set
    }

    /// Returns true if `name` was explicitly supplied.
    pub fn is_set(&self, name: &str) -> bool {
        self.fields_set.contains(name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A copy restricted to the explicitly supplied fields.
    pub fn explicit_only(&self) -> Record {
        Record {
            fields: self
                .fields
                .iter()
                .filter(|(n, _)| self.fields_set.contains(n))
                .cloned()
                .collect(),
            fields_set: self.fields_set.clone(),
        }
    }

    /// Compare field values only, ignoring provenance at every depth.
    pub fn values_eq(&self, other: &Record) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|((an, av), (bn, bv))| an == bn && av.values_eq(bv))
    }

    /// Consume the record, returning its fields in order.
    pub fn into_fields(self) -> Vec<(String, FieldValue)> {
        self.fields
    }
}
