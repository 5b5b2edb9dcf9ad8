//! # Declarative Schema Definitions
//!
//! Schemas without custom validators can be written in YAML or JSON and
//! compiled into a [`Schema`]:
//!
//! ```yaml
//! name: Order
//! config: { extra: forbid }
//! fields:
//!   - name: order_id
//!     type: string
//!     constraints: { pattern: "^ORD-\\d{6}$" }
//!   - name: items
//!     type: { list: { model: OrderItem } }
//!     constraints: { min_items: 1 }
//!   - name: note
//!     type: { optional: string }
//!     default: null
//! models:
//!   OrderItem:
//!     fields:
//!       - { name: quantity, type: integer, constraints: { gt: 0, le: 100 } }
//! ```
//!
//! Type names are the scalar names (`integer`, `float`, `boolean`,
//! `string`, `decimal`, `timestamp`) or the name of an entry in `models`.
//! Compound types are single-key mappings: `list`, `map`, `optional`,
//! `model`. List and map elements may carry their own constraints with
//! `{ type: ..., constraints: {...} }`.
//!
//! Defaults and `one_of` values are coerced through the field's type when
//! the definition is compiled, so a bad default is a compile error rather
//! than a surprise at validation time. Models that reference each other in
//! a cycle are rejected.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use datagate_core::{DatagateError, Decimal};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::coerce::CoerceMode;
use crate::constraint::{Constraint, Limit};
use crate::engine::coerce_type;
use crate::field::Field;
use crate::report::FieldError;
use crate::schema::{ModelConfig, Schema, SchemaError};
use crate::types::{Element, FieldType, ScalarType};

/// Error loading or compiling a schema definition.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("invalid YAML definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field '{field}' has unknown type '{name}'")]
    UnknownType { field: String, name: String },

    #[error("model '{name}' is not defined")]
    UnknownModel { name: String },

    #[error("models reference each other in a cycle: {chain}")]
    ModelCycle { chain: String },

    #[error("field '{field}' has an invalid default: {reason}")]
    InvalidDefault { field: String, reason: String },

    #[error("field '{field}' has an invalid '{constraint}' constraint: {reason}")]
    InvalidConstraint {
        field: String,
        constraint: &'static str,
        reason: String,
    },

    #[error("field '{field}' is not required, so it needs a default or an optional type")]
    MissingDefault { field: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<SchemaError> for DatagateError {
    fn from(err: SchemaError) -> Self {
        DatagateError::Schema(err.to_string())
    }
}

impl From<DefinitionError> for DatagateError {
    fn from(err: DefinitionError) -> Self {
        match err {
            DefinitionError::Schema(inner) => inner.into(),
            other => DatagateError::Definition(other.to_string()),
        }
    }
}

/// A top-level schema definition document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub config: ModelConfig,
    pub fields: Vec<FieldDefinition>,
    /// Named schemas the fields may refer to.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub models: BTreeMap<String, ModelDefinition>,
}

/// A named nested schema inside a definition document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDefinition {
    #[serde(default)]
    pub config: ModelConfig,
    pub fields: Vec<FieldDefinition>,
}

/// One declared field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// `None` when absent; `Some(Value::Null)` for an explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(default)]
    pub constraints: ConstraintsDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Environment variable that supplies this field in settings loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

/// Distinguish an explicit `null` from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A declared type: a name, or a single-key compound mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDefinition {
    Name(String),
    Compound(CompoundType),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundType {
    List(Box<ElementDefinition>),
    Map(Box<ElementDefinition>),
    Optional(Box<TypeDefinition>),
    Model(String),
}

/// Element type of a list or map, optionally constrained.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementDefinition {
    Constrained {
        #[serde(rename = "type")]
        ty: TypeDefinition,
        #[serde(default)]
        constraints: ConstraintsDefinition,
    },
    Plain(TypeDefinition),
}

/// Constraint parameters. Bounds accept integers, floats, or decimal
/// strings (compared exactly).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstraintsDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ge: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub le: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub email: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
}

impl SchemaDefinition {
    pub fn from_yaml_str(text: &str) -> Result<Self, DefinitionError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Compile the definition and every model it references.
    ///
    /// # Errors
    ///
    /// Returns the first [`DefinitionError`] found.
    pub fn compile(&self) -> Result<Arc<Schema>, DefinitionError> {
        let mut compiler = Compiler {
            models: &self.models,
            built: HashMap::new(),
            visiting: Vec::new(),
        };
        let schema = compiler.schema(&self.name, &self.config, &self.fields)?;
        tracing::debug!(
            schema = %self.name,
            models = compiler.built.len(),
            "compiled schema definition"
        );
        Ok(schema)
    }
}

/// Read and compile a definition file. `.json` files are parsed as JSON,
/// anything else as YAML.
///
/// # Errors
///
/// Returns [`DatagateError::Io`] if the file cannot be read, and
/// [`DatagateError::Definition`] or [`DatagateError::Schema`] if it does
/// not compile.
pub fn load_schema_file(path: impl AsRef<std::path::Path>) -> Result<Arc<Schema>, DatagateError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let definition = if is_json {
        SchemaDefinition::from_json_str(&text)?
    } else {
        SchemaDefinition::from_yaml_str(&text)?
    };
    tracing::debug!(path = %path.display(), schema = %definition.name, "loaded schema definition");
    Ok(definition.compile()?)
}

struct Compiler<'a> {
    models: &'a BTreeMap<String, ModelDefinition>,
    built: HashMap<String, Arc<Schema>>,
    /// Models currently being compiled, outermost first.
    visiting: Vec<String>,
}

impl Compiler<'_> {
    fn schema(
        &mut self,
        name: &str,
        config: &ModelConfig,
        fields: &[FieldDefinition],
    ) -> Result<Arc<Schema>, DefinitionError> {
        let mut builder = Schema::builder(name).config(config.clone());
        for def in fields {
            builder = builder.field(self.field(def)?);
        }
        Ok(builder.build()?)
    }

    fn model(&mut self, name: &str) -> Result<Arc<Schema>, DefinitionError> {
        if let Some(schema) = self.built.get(name) {
            return Ok(Arc::clone(schema));
        }
        if self.visiting.iter().any(|v| v == name) {
            let mut chain = self.visiting.clone();
            chain.push(name.to_string());
            return Err(DefinitionError::ModelCycle {
                chain: chain.join(" -> "),
            });
        }
        let models = self.models;
        let def = models.get(name).ok_or_else(|| DefinitionError::UnknownModel {
            name: name.to_string(),
        })?;
        self.visiting.push(name.to_string());
        let schema = self.schema(name, &def.config, &def.fields)?;
        self.visiting.pop();
        self.built.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn field(&mut self, def: &FieldDefinition) -> Result<Field, DefinitionError> {
        let ty = self.resolve(&def.name, &def.ty)?;
        let constraints = compile_constraints(&def.name, &ty, &def.constraints)?;
        let mut field = Field::new(&def.name, ty.clone());
        for constraint in constraints {
            field = field.constraint(constraint);
        }

        match (&def.default, def.required) {
            (Some(raw), _) => {
                let value = coerce_type(&ty, raw, CoerceMode::lax()).map_err(|errors| {
                    DefinitionError::InvalidDefault {
                        field: def.name.clone(),
                        reason: describe(&errors),
                    }
                })?;
                field = field.default(value);
            }
            (None, Some(false)) if ty.is_optional() => field = field.default(None::<i64>),
            (None, Some(false)) => {
                return Err(DefinitionError::MissingDefault {
                    field: def.name.clone(),
                })
            }
            (None, _) => {}
        }
        if def.required == Some(true) {
            field = field.required();
        }
        if let Some(strict) = def.strict {
            field = field.strict(strict);
        }
        if let Some(text) = &def.description {
            field = field.description(text.as_str());
        }
        if let Some(var) = &def.env {
            field = field.env(var.as_str());
        }
        Ok(field)
    }

    fn resolve(&mut self, field: &str, def: &TypeDefinition) -> Result<FieldType, DefinitionError> {
        match def {
            TypeDefinition::Name(name) => {
                if let Some(scalar) = ScalarType::from_name(name) {
                    Ok(FieldType::Scalar(scalar))
                } else if self.models.contains_key(name) {
                    Ok(FieldType::model(self.model(name)?))
                } else {
                    Err(DefinitionError::UnknownType {
                        field: field.to_string(),
                        name: name.clone(),
                    })
                }
            }
            TypeDefinition::Compound(CompoundType::List(element)) => {
                Ok(FieldType::list(self.element(field, element)?))
            }
            TypeDefinition::Compound(CompoundType::Map(element)) => {
                Ok(FieldType::map(self.element(field, element)?))
            }
            TypeDefinition::Compound(CompoundType::Optional(inner)) => {
                Ok(FieldType::optional(self.resolve(field, inner)?))
            }
            TypeDefinition::Compound(CompoundType::Model(name)) => Ok(FieldType::model(self.model(name)?)),
        }
    }

    fn element(&mut self, field: &str, def: &ElementDefinition) -> Result<Element, DefinitionError> {
        match def {
            ElementDefinition::Plain(ty) => Ok(Element::new(self.resolve(field, ty)?)),
            ElementDefinition::Constrained { ty, constraints } => {
                let ty = self.resolve(field, ty)?;
                let compiled = compile_constraints(field, &ty, constraints)?;
                Ok(compiled
                    .into_iter()
                    .fold(Element::new(ty), Element::constrain))
            }
        }
    }
}

fn compile_constraints(
    field: &str,
    ty: &FieldType,
    def: &ConstraintsDefinition,
) -> Result<Vec<Constraint>, DefinitionError> {
    let invalid = |constraint: &'static str, reason: String| DefinitionError::InvalidConstraint {
        field: field.to_string(),
        constraint,
        reason,
    };
    let mut out = Vec::new();

    let bounds: [(&'static str, &Option<Value>, fn(Limit) -> Constraint); 5] = [
        ("gt", &def.gt, |l| Constraint::gt(l)),
        ("ge", &def.ge, |l| Constraint::ge(l)),
        ("lt", &def.lt, |l| Constraint::lt(l)),
        ("le", &def.le, |l| Constraint::le(l)),
        ("multiple_of", &def.multiple_of, |l| Constraint::multiple_of(l)),
    ];
    for (name, raw, make) in bounds {
        if let Some(raw) = raw {
            let limit = limit(raw).ok_or_else(|| invalid(name, format!("{raw} is not a number")))?;
            out.push(make(limit));
        }
    }

    if let Some(n) = def.min_length {
        out.push(Constraint::min_length(n));
    }
    if let Some(n) = def.max_length {
        out.push(Constraint::max_length(n));
    }
    if let Some(n) = def.min_items {
        out.push(Constraint::min_items(n));
    }
    if let Some(n) = def.max_items {
        out.push(Constraint::max_items(n));
    }
    if let Some(source) = &def.pattern {
        out.push(Constraint::pattern(source).map_err(|e| invalid("pattern", e.to_string()))?);
    }
    if def.email {
        out.push(Constraint::email().map_err(|e| invalid("email", e.to_string()))?);
    }
    if let Some(allowed) = &def.one_of {
        let element_ty = ty.base();
        let mut values = Vec::with_capacity(allowed.len());
        for raw in allowed {
            let value = coerce_type(element_ty, raw, CoerceMode::lax())
                .map_err(|errors| invalid("one_of", describe(&errors)))?;
            values.push(value);
        }
        out.push(Constraint::OneOf(values));
    }
    Ok(out)
}

fn limit(raw: &Value) -> Option<Limit> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .map(Limit::Int)
            .or_else(|| n.as_f64().map(Limit::Float)),
        Value::String(s) => Decimal::from_str(s).ok().map(Limit::Decimal),
        _ => None,
    }
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| {
            if e.loc.is_root() {
                e.message.clone()
            } else {
                format!("{}: {}", e.loc, e.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagate_core::FieldValue;
    use serde_json::json;

    const ORDER: &str = r#"
name: Order
config: { extra: forbid }
fields:
  - name: order_id
    type: string
    constraints: { pattern: "^ORD-\\d{6}$" }
  - name: items
    type: { list: { model: OrderItem } }
    constraints: { min_items: 1 }
  - name: status
    type: string
    default: pending
    constraints: { one_of: [pending, paid, shipped] }
  - name: note
    type: { optional: string }
    required: false
models:
  OrderItem:
    fields:
      - { name: sku, type: string }
      - { name: quantity, type: integer, constraints: { gt: 0, le: 100 } }
      - { name: price, type: decimal, constraints: { ge: "0.01" } }
"#;

    #[test]
    fn test_compile_order_definition() {
        let schema = SchemaDefinition::from_yaml_str(ORDER).unwrap().compile().unwrap();
        assert_eq!(schema.name(), "Order");
        assert_eq!(schema.fields().len(), 4);
        assert!(schema.field("status").unwrap().default().is_some());
        assert!(schema.field("note").unwrap().ty().is_optional());
        assert_eq!(schema.field("items").unwrap().ty().to_string(), "list[model OrderItem]");
    }

    #[test]
    fn test_compiled_schema_validates() {
        let schema = SchemaDefinition::from_yaml_str(ORDER).unwrap().compile().unwrap();
        let instance = schema
            .validate(&json!({
                "order_id": "ORD-000042",
                "items": [{"sku": "A1", "quantity": "2", "price": "9.99"}],
            }))
            .unwrap();
        assert_eq!(instance.get("status"), Some(&FieldValue::from("pending")));
        assert_eq!(instance.get("note"), Some(&FieldValue::Null));

        let report = schema
            .validate(&json!({
                "order_id": "ORD-42",
                "items": [{"sku": "A1", "quantity": 0, "price": "0"}],
                "status": "lost",
                "coupon": "FREE",
            }))
            .unwrap_err();
        let locs: Vec<String> = report.errors().iter().map(|e| e.loc.to_string()).collect();
        assert_eq!(
            locs,
            vec!["order_id", "items[0].quantity", "items[0].price", "status", "coupon"]
        );
    }

    #[test]
    fn test_element_constraints() {
        let def = SchemaDefinition::from_yaml_str(
            r#"
name: Tastes
fields:
  - name: tastes
    type: { map: { type: integer, constraints: { ge: 0 } } }
"#,
        )
        .unwrap();
        let schema = def.compile().unwrap();
        let report = schema.validate(&json!({"tastes": {"wine": -1}})).unwrap_err();
        assert_eq!(report.errors()[0].loc.to_string(), "tastes.wine");
    }

    #[test]
    fn test_model_cycle_detected() {
        let def = SchemaDefinition::from_yaml_str(
            r#"
name: Root
fields:
  - { name: a, type: A }
models:
  A:
    fields: [{ name: b, type: { model: B } }]
  B:
    fields: [{ name: a, type: { optional: A } }]
"#,
        )
        .unwrap();
        match def.compile() {
            Err(DefinitionError::ModelCycle { chain }) => assert_eq!(chain, "A -> B -> A"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type() {
        let def = SchemaDefinition::from_json_str(
            r#"{"name": "X", "fields": [{"name": "id", "type": "uuid"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            def.compile(),
            Err(DefinitionError::UnknownType { ref name, .. }) if name == "uuid"
        ));
    }

    #[test]
    fn test_invalid_default() {
        let def = SchemaDefinition::from_yaml_str(
            "name: X\nfields:\n  - { name: n, type: integer, default: lots }\n",
        )
        .unwrap();
        assert!(matches!(def.compile(), Err(DefinitionError::InvalidDefault { .. })));
    }

    #[test]
    fn test_not_required_needs_default() {
        let def = SchemaDefinition::from_yaml_str(
            "name: X\nfields:\n  - { name: n, type: integer, required: false }\n",
        )
        .unwrap();
        assert!(matches!(def.compile(), Err(DefinitionError::MissingDefault { .. })));
    }

    #[test]
    fn test_inapplicable_constraint_surfaces_schema_error() {
        let def = SchemaDefinition::from_yaml_str(
            "name: X\nfields:\n  - { name: n, type: integer, constraints: { min_length: 2 } }\n",
        )
        .unwrap();
        assert!(matches!(
            def.compile(),
            Err(DefinitionError::Schema(SchemaError::InapplicableConstraint { .. }))
        ));
    }

    #[test]
    fn test_explicit_null_default() {
        let def = SchemaDefinition::from_yaml_str(
            "name: X\nfields:\n  - { name: n, type: { optional: integer }, default: null }\n",
        )
        .unwrap();
        assert_eq!(def.fields[0].default, Some(Value::Null));
        let schema = def.compile().unwrap();
        assert!(!schema.field("n").unwrap().is_required());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(SchemaDefinition::from_yaml_str("name: X\nfields: []\ncolour: red\n").is_err());
    }
}
