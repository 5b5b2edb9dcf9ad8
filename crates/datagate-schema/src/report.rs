//! # Validation Reports
//!
//! A single validation run accumulates every failure it finds into an
//! [`ErrorCollector`]. The collector is turned into a [`ValidationReport`]
//! only when at least one error was recorded, so a report is never empty.
//!
//! Errors are ordered the way they are found: fields in declaration order,
//! constraints in registration order within a field, extra keys last.
//! Nested validations are absorbed with the parent location spliced in
//! front of every nested path.

use std::fmt;

use datagate_core::Path;
use serde::Serialize;
use serde_json::Value;

use crate::coerce::CoercionError;
use crate::constraint::ConstraintError;

/// Category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The input (or a nested input) is not a mapping.
    Structural,
    /// A required field was absent.
    MissingField,
    /// A present value could not be converted to the declared type.
    Coercion,
    /// A coerced value violated a declared constraint.
    Constraint,
    /// A field-level or whole-instance validator rejected the value.
    CustomValidation,
    /// An undeclared key under `extra = forbid`.
    ExtraField,
}

/// A single, path-qualified validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Location of the offending value, outermost segment first.
    pub loc: Path,
    pub kind: ErrorKind,
    /// Stable machine-readable code, e.g. `int_parsing`.
    pub code: String,
    #[serde(rename = "msg")]
    pub message: String,
    /// The raw input at `loc`, or null when there was none.
    pub input: Value,
}

impl FieldError {
    pub fn new(
        loc: Path,
        kind: ErrorKind,
        code: impl Into<String>,
        message: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            loc,
            kind,
            code: code.into(),
            message: message.into(),
            input,
        }
    }

    pub fn structural(loc: Path, input: &Value) -> Self {
        let message = if loc.is_root() {
            "Input should be a valid mapping"
        } else {
            "Input should be a valid mapping or instance"
        };
        Self::new(loc, ErrorKind::Structural, "model_type", message, input.clone())
    }

    pub fn missing(loc: Path) -> Self {
        Self::new(loc, ErrorKind::MissingField, "missing", "Field required", Value::Null)
    }

    pub fn coercion(loc: Path, err: &CoercionError, input: &Value) -> Self {
        Self::new(loc, ErrorKind::Coercion, err.code(), err.to_string(), input.clone())
    }

    pub fn constraint(loc: Path, err: &ConstraintError, input: &Value) -> Self {
        Self::new(loc, ErrorKind::Constraint, err.code(), err.message(), input.clone())
    }

    pub fn custom(loc: Path, code: &str, message: impl Into<String>, input: Value) -> Self {
        Self::new(loc, ErrorKind::CustomValidation, code, message, input)
    }

    pub fn extra(loc: Path, input: &Value) -> Self {
        Self::new(
            loc,
            ErrorKind::ExtraField,
            "extra_forbidden",
            "Extra inputs are not permitted",
            input.clone(),
        )
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {}: {} [{}]", self.loc, self.message, self.code)
    }
}

/// The complete set of failures from one validation attempt.
///
/// Never empty. Implements [`std::error::Error`] so it composes with `?`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Name of the schema that was validated against.
    pub schema: String,
    errors: Vec<FieldError>,
}

impl ValidationReport {
    /// All failures, in the order they were found.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false for a report produced by validation.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.errors.len() == 1 { "error" } else { "errors" };
        write!(
            f,
            "{} validation {noun} for schema '{}':",
            self.errors.len(),
            self.schema
        )?;
        for error in &self.errors {
            write!(f, "\n{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// Accumulates failures during a single validation run.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<FieldError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Take over the errors of a nested run, re-rooted under `prefix`.
    pub fn absorb(&mut self, nested: ErrorCollector, prefix: &Path) {
        self.errors.extend(nested.errors.into_iter().map(|mut error| {
            error.loc = error.loc.prefixed(prefix);
            error
        }));
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// The report for `schema`, or `None` if nothing was recorded.
    pub fn into_report(self, schema: &str) -> Option<ValidationReport> {
        if self.errors.is_empty() {
            None
        } else {
            Some(ValidationReport {
                schema: schema.to_string(),
                errors: self.errors,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_collector_has_no_report() {
        assert!(ErrorCollector::new().into_report("User").is_none());
    }

    #[test]
    fn test_absorb_splices_parent_path() {
        let mut nested = ErrorCollector::new();
        nested.push(FieldError::missing(Path::root().child("postal")));
        let mut parent = ErrorCollector::new();
        parent.absorb(nested, &Path::root().child("address"));
        let report = parent.into_report("Customer").unwrap();
        assert_eq!(report.errors()[0].loc.to_string(), "address.postal");
    }

    #[test]
    fn test_report_display() {
        let mut collector = ErrorCollector::new();
        collector.push(FieldError::missing(Path::root().child("id")));
        collector.push(FieldError::structural(Path::root(), &json!(3)));
        let report = collector.into_report("User").unwrap();
        assert_eq!(
            report.to_string(),
            "2 validation errors for schema 'User':\n  id: Field required [missing]\n  (root): Input should be a valid mapping [model_type]"
        );
    }

    #[test]
    fn test_serializes_loc_msg_shape() {
        let error = FieldError::missing(Path::root().child("items").child(0usize));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            json!({
                "loc": ["items", 0],
                "kind": "missing_field",
                "code": "missing",
                "msg": "Field required",
                "input": null,
            })
        );
    }
}
