//! # Declared Field Types
//!
//! [`FieldType`] is the target of coercion. Scalars map one-to-one onto
//! [`FieldValue`] variants; compound types describe their elements through
//! an [`Element`], which carries the element's own constraints (a mapping
//! of string to *positive* integer, say).
//!
//! Nested schemas are embedded as `Arc<Schema>`. A schema must be fully
//! built before another can embed it, so cyclic schemas cannot be
//! expressed.

use std::fmt;
use std::sync::Arc;

use datagate_core::{FieldValue, Record, ValueKind};

use crate::constraint::Constraint;
use crate::schema::Schema;

/// Primitive target types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int,
    Float,
    Bool,
    Str,
    Decimal,
    Timestamp,
}

impl ScalarType {
    /// Type name used in messages and schema definitions.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int => "integer",
            ScalarType::Float => "float",
            ScalarType::Bool => "boolean",
            ScalarType::Str => "string",
            ScalarType::Decimal => "decimal",
            ScalarType::Timestamp => "timestamp",
        }
    }

    /// Parse a type name as written in schema definitions.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "integer" | "int" => Some(ScalarType::Int),
            "float" | "number" => Some(ScalarType::Float),
            "boolean" | "bool" => Some(ScalarType::Bool),
            "string" | "str" => Some(ScalarType::Str),
            "decimal" => Some(ScalarType::Decimal),
            "timestamp" | "datetime" => Some(ScalarType::Timestamp),
            _ => None,
        }
    }

    /// The value kind a successful coercion produces.
    pub fn kind(&self) -> ValueKind {
        match self {
            ScalarType::Int => ValueKind::Int,
            ScalarType::Float => ValueKind::Float,
            ScalarType::Bool => ValueKind::Bool,
            ScalarType::Str => ValueKind::Str,
            ScalarType::Decimal => ValueKind::Decimal,
            ScalarType::Timestamp => ValueKind::Timestamp,
        }
    }

    /// Returns true for integer, float and decimal.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::Float | ScalarType::Decimal)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type of a list or mapping, with its own constraints.
#[derive(Debug, Clone)]
pub struct Element {
    pub ty: FieldType,
    pub constraints: Vec<Constraint>,
}

impl Element {
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            constraints: Vec::new(),
        }
    }

    /// Attach a constraint every element must satisfy.
    pub fn constrain(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

impl From<FieldType> for Element {
    fn from(ty: FieldType) -> Self {
        Element::new(ty)
    }
}

/// The declared type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    Scalar(ScalarType),
    /// Ordered sequence of elements.
    List(Box<Element>),
    /// Mapping of string keys to elements.
    Map(Box<Element>),
    /// A nested schema.
    Model(Arc<Schema>),
    /// The inner type, or the null marker.
    Optional(Box<FieldType>),
}

impl FieldType {
    pub fn int() -> Self {
        FieldType::Scalar(ScalarType::Int)
    }

    pub fn float() -> Self {
        FieldType::Scalar(ScalarType::Float)
    }

    pub fn boolean() -> Self {
        FieldType::Scalar(ScalarType::Bool)
    }

    pub fn string() -> Self {
        FieldType::Scalar(ScalarType::Str)
    }

    pub fn decimal() -> Self {
        FieldType::Scalar(ScalarType::Decimal)
    }

    pub fn timestamp() -> Self {
        FieldType::Scalar(ScalarType::Timestamp)
    }

    pub fn list(element: impl Into<Element>) -> Self {
        FieldType::List(Box::new(element.into()))
    }

    pub fn map(element: impl Into<Element>) -> Self {
        FieldType::Map(Box::new(element.into()))
    }

    pub fn model(schema: Arc<Schema>) -> Self {
        FieldType::Model(schema)
    }

    pub fn optional(inner: FieldType) -> Self {
        match inner {
            already @ FieldType::Optional(_) => already,
            other => FieldType::Optional(Box::new(other)),
        }
    }

    /// Returns true if the null marker is a valid value of this type.
    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    /// This type with any `Optional` wrapper removed.
    pub fn base(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner.base(),
            other => other,
        }
    }

    /// Returns true if `value` is a well-formed value of this type.
    ///
    /// Used to check that defaults and validator outputs keep the declared
    /// type. Constraints are not re-checked.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (FieldType::Optional(_), FieldValue::Null) => true,
            (FieldType::Optional(inner), other) => inner.accepts(other),
            (FieldType::Scalar(scalar), other) => scalar.kind() == other.kind(),
            (FieldType::List(element), FieldValue::List(items)) => {
                items.iter().all(|item| element.ty.accepts(item))
            }
            (FieldType::Map(element), FieldValue::Map(entries)) => {
                entries.iter().all(|(_, v)| element.ty.accepts(v))
            }
            (FieldType::Model(schema), FieldValue::Model(record)) => conforms(schema, record),
            _ => false,
        }
    }
}

/// Returns true if `record` has exactly the schema's fields, in order,
/// each of the declared type.
pub(crate) fn conforms(schema: &Schema, record: &Record) -> bool {
    record.len() == schema.fields().len()
        && schema
            .fields()
            .iter()
            .zip(record.fields())
            .all(|(field, (name, value))| field.name() == name && field.ty().accepts(value))
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(scalar) => f.write_str(scalar.name()),
            FieldType::List(element) => write!(f, "list[{}]", element.ty),
            FieldType::Map(element) => write!(f, "mapping[string, {}]", element.ty),
            FieldType::Model(schema) => write!(f, "model {}", schema.name()),
            FieldType::Optional(inner) => write!(f, "optional[{inner}]"),
        }
    }
}
