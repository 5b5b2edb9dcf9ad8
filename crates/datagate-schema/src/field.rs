//! # Field Descriptors
//!
//! A [`Field`] is the builder a schema author fills in; the schema builder
//! checks it and freezes it into a [`FieldDescriptor`]. Descriptors are
//! immutable and shared by every validation run of their schema.

use std::fmt;
use std::sync::Arc;

use datagate_core::{FieldValue, Record};

use crate::constraint::Constraint;
use crate::schema::{ModelConfig, SchemaError};
use crate::types::FieldType;

/// Context handed to a field-level validator.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInfo<'a> {
    /// Name of the field being validated.
    pub field: &'a str,
    /// Sibling fields visible to the validator, per
    /// [`ModelConfig::validators_see`].
    pub data: &'a Record,
    pub config: &'a ModelConfig,
}

/// A field-level validator: receives the coerced value and may return it
/// adjusted (same declared type) or reject it with a message.
pub type FieldValidatorFn =
    dyn Fn(FieldValue, &ValidationInfo<'_>) -> Result<FieldValue, String> + Send + Sync;

/// A registered field-level validator.
#[derive(Clone)]
pub struct FieldValidator {
    name: String,
    func: Arc<FieldValidatorFn>,
}

impl FieldValidator {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, value: FieldValue, info: &ValidationInfo<'_>) -> Result<FieldValue, String> {
        (self.func)(value, info)
    }
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator").field("name", &self.name).finish()
    }
}

/// Value used when a field is absent from the input.
#[derive(Clone)]
pub enum DefaultValue {
    Value(FieldValue),
    /// Invoked once per missing field per validation call.
    Factory(Arc<dyn Fn() -> FieldValue + Send + Sync>),
}

impl DefaultValue {
    /// Produce the default for one validation run.
    pub fn produce(&self) -> FieldValue {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Builder for one field of a schema.
///
/// A field is required unless it is given a default. [`Field::optional`]
/// declares a nullable field that defaults to null.
#[derive(Debug)]
pub struct Field {
    name: String,
    ty: FieldType,
    default: Option<DefaultValue>,
    explicit_required: bool,
    constraints: Vec<Constraint>,
    strict: Option<bool>,
    validators: Vec<FieldValidator>,
    description: Option<String>,
    env: Option<String>,
    deferred: Option<SchemaError>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            explicit_required: false,
            constraints: Vec::new(),
            strict: None,
            validators: Vec::new(),
            description: None,
            env: None,
            deferred: None,
        }
    }

    /// A nullable field of type `inner` that defaults to null.
    pub fn optional(name: impl Into<String>, inner: FieldType) -> Self {
        Self::new(name, FieldType::optional(inner)).default(FieldValue::Null)
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Add a regular-expression constraint. An invalid pattern surfaces as
    /// a [`SchemaError`] when the schema is built.
    pub fn pattern(mut self, source: &str) -> Self {
        match Constraint::pattern(source) {
            Ok(constraint) => self.constraints.push(constraint),
            Err(err) if self.deferred.is_none() => {
                self.deferred = Some(SchemaError::InvalidPattern {
                    field: self.name.clone(),
                    pattern: source.to_string(),
                    reason: err.to_string(),
                });
            }
            Err(_) => {}
        }
        self
    }

    pub fn default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_factory(mut self, factory: impl Fn() -> FieldValue + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::Factory(Arc::new(factory)));
        self
    }

    /// Insist that the field is required. Conflicts with a default.
    pub fn required(mut self) -> Self {
        self.explicit_required = true;
        self
    }

    /// Override the schema's strictness for this field.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Register a field-level validator. Validators run in registration
    /// order, each receiving the previous one's output.
    pub fn validator(
        mut self,
        name: impl Into<String>,
        func: impl Fn(FieldValue, &ValidationInfo<'_>) -> Result<FieldValue, String> + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(FieldValidator {
            name: name.into(),
            func: Arc::new(func),
        });
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Read this field from the named environment variable in
    /// [`EnvSettings`](crate::EnvSettings), ignoring any prefix or
    /// nesting.
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check the field in isolation and freeze it.
    pub(crate) fn build(self) -> Result<FieldDescriptor, SchemaError> {
        if let Some(err) = self.deferred {
            return Err(err);
        }
        if self.explicit_required && self.default.is_some() {
            return Err(SchemaError::RequiredWithDefault { field: self.name });
        }
        if let Some(constraint) = self.constraints.iter().find(|c| !c.applies_to(&self.ty)) {
            return Err(SchemaError::InapplicableConstraint {
                field: self.name.clone(),
                constraint: constraint.name(),
                ty: self.ty.to_string(),
            });
        }
        if let Some(DefaultValue::Value(value)) = &self.default {
            if !self.ty.accepts(value) {
                return Err(SchemaError::DefaultTypeMismatch {
                    field: self.name.clone(),
                    ty: self.ty.to_string(),
                    found: value.kind().name(),
                });
            }
        }
        Ok(FieldDescriptor {
            name: self.name,
            ty: self.ty,
            default: self.default,
            constraints: self.constraints,
            strict: self.strict,
            validators: self.validators,
            description: self.description,
            env: self.env,
        })
    }
}

/// Frozen per-field metadata.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    ty: FieldType,
    default: Option<DefaultValue>,
    constraints: Vec<Constraint>,
    strict: Option<bool>,
    validators: Vec<FieldValidator>,
    description: Option<String>,
    env: Option<String>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// A field with no default must appear in every valid input.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Strictness override, if any.
    pub fn strict(&self) -> Option<bool> {
        self.strict
    }

    pub fn validators(&self) -> &[FieldValidator] {
        &self.validators
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Environment variable bound to this field, if any.
    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }
}
