//! # Schemas
//!
//! A [`Schema`] is an ordered collection of field descriptors, a
//! [`ModelConfig`], and zero or more whole-instance validators. Schemas are
//! assembled with a [`SchemaBuilder`], checked once at [`SchemaBuilder::build`],
//! and handed out as `Arc<Schema>`: immutable, `Send + Sync`, and safe to
//! validate against from any number of threads at once.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use datagate_core::{Path, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::engine;
use crate::field::{Field, FieldDescriptor};
use crate::instance::Instance;
use crate::report::ValidationReport;

/// Error building a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    #[error("field '{field}' is marked required but has a default")]
    RequiredWithDefault { field: String },

    #[error("constraint '{constraint}' cannot apply to field '{field}' of type {ty}")]
    InapplicableConstraint {
        field: String,
        constraint: &'static str,
        ty: String,
    },

    #[error("default of field '{field}' is a {found}, expected {ty}")]
    DefaultTypeMismatch {
        field: String,
        ty: String,
        found: &'static str,
    },

    #[error("field '{field}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("schema name must not be empty")]
    EmptyName,
}

/// Handling of input keys the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraFields {
    #[default]
    Ignore,
    Forbid,
}

/// Which siblings a field-level validator can see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingVisibility {
    /// Every field processed so far, defaults included.
    #[default]
    Processed,
    /// Only the processed fields the caller supplied explicitly.
    Explicit,
}

/// Per-schema behavior, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Default strictness for fields that do not override it.
    pub strict: bool,
    /// Trim surrounding whitespace from string inputs.
    pub strip_whitespace: bool,
    pub extra: ExtraFields,
    pub validators_see: SiblingVisibility,
    /// Run field-level validators on defaulted fields too.
    pub validate_defaults: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            strict: false,
            strip_whitespace: false,
            extra: ExtraFields::Ignore,
            validators_see: SiblingVisibility::Processed,
            validate_defaults: true,
        }
    }
}

/// A whole-instance validator rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub message: String,
    /// Where to report the failure; the root by default.
    pub loc: Path,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            loc: Path::root(),
        }
    }

    /// Report the rejection against a specific location.
    pub fn at(mut self, loc: Path) -> Self {
        self.loc = loc;
        self
    }
}

impl From<&str> for Rejection {
    fn from(message: &str) -> Self {
        Rejection::new(message)
    }
}

impl From<String> for Rejection {
    fn from(message: String) -> Self {
        Rejection::new(message)
    }
}

/// Signature of a whole-instance validator.
pub type ModelValidatorFn = dyn Fn(Record) -> Result<Record, Rejection> + Send + Sync;

#[derive(Clone)]
pub(crate) struct ModelValidator {
    pub(crate) name: String,
    pub(crate) func: Arc<ModelValidatorFn>,
}

/// An immutable, validated record shape.
pub struct Schema {
    name: String,
    fields: Vec<FieldDescriptor>,
    config: ModelConfig,
    model_validators: Vec<ModelValidator>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Names of the registered whole-instance validators, in order.
    pub fn model_validator_names(&self) -> impl Iterator<Item = &str> {
        self.model_validators.iter().map(|v| v.name.as_str())
    }

    pub(crate) fn model_validators(&self) -> &[ModelValidator] {
        &self.model_validators
    }

    /// Validate an untyped input against this schema.
    ///
    /// # Errors
    ///
    /// Returns the complete [`ValidationReport`] if any field, extra key or
    /// whole-instance validator failed.
    pub fn validate(self: &Arc<Self>, raw: &Value) -> Result<Instance, ValidationReport> {
        engine::validate(self, raw).map(|record| Instance::new(Arc::clone(self), record))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("config", &self.config)
            .field(
                "model_validators",
                &self.model_validator_names().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Assembles a [`Schema`].
pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
    config: ModelConfig,
    model_validators: Vec<ModelValidator>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            config: ModelConfig::default(),
            model_validators: Vec::new(),
        }
    }

    /// Append a field. Declaration order is validation order.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a whole-instance validator. These run in registration
    /// order, only when every field validated cleanly, and stop at the
    /// first rejection.
    pub fn model_validator(
        mut self,
        name: impl Into<String>,
        func: impl Fn(Record) -> Result<Record, Rejection> + Send + Sync + 'static,
    ) -> Self {
        self.model_validators.push(ModelValidator {
            name: name.into(),
            func: Arc::new(func),
        });
        self
    }

    /// Check every field and freeze the schema.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found, in declaration order.
    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        let mut seen = BTreeSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            if !seen.insert(field.name().to_string()) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name,
                    field: field.name().to_string(),
                });
            }
            fields.push(field.build()?);
        }
        tracing::debug!(schema = %self.name, fields = fields.len(), "schema built");
        Ok(Arc::new(Schema {
            name: self.name,
            fields,
            config: self.config,
            model_validators: self.model_validators,
        }))
    }
}
