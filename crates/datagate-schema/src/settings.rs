//! # Environment Settings
//!
//! Assembles the untyped input for a schema from environment-style
//! `(key, value)` pairs and validates it like any other input, so coercion,
//! defaults and error reporting follow the normal rules.
//!
//! Key mapping, for a prefix of `APP_` and the default `__` delimiter:
//!
//! | Variable | Becomes |
//! |----------|---------|
//! | `APP_PORT=8080` | `{"port": "8080"}` |
//! | `APP_HOSTS=a, b` | `{"hosts": ["a", "b"]}` |
//! | `APP_HOSTS=["a","b"]` | `{"hosts": ["a", "b"]}` |
//! | `APP_DB={"host":"x"}` | `{"db": {"host": "x"}}` |
//! | `APP_DB__PORT=5432` | `{"db": {"port": "5432"}}` |
//!
//! Keys match field names case-insensitively unless configured otherwise.
//! Delimited keys override the same key inside a JSON-valued variable.
//! When two variables normalize to the same key, the one whose original
//! key sorts first wins, whatever order the environment lists them in.
//!
//! A field declared with [`Field::env`](crate::Field::env) reads only the
//! variable it names, at any nesting depth and without the prefix:
//!
//! | Field | Variable |
//! |-------|----------|
//! | `database.url` with `env("DATABASE_URL")` | `DATABASE_URL=postgres://db` |
//!
//! Values are never logged.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::instance::Instance;
use crate::report::ValidationReport;
use crate::schema::Schema;
use crate::types::FieldType;

/// Reads settings for a schema from environment-style variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSettings {
    prefix: String,
    delimiter: String,
    case_sensitive: bool,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            delimiter: "__".to_string(),
            case_sensitive: false,
        }
    }
}

impl EnvSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only variables starting with `prefix` are considered; the prefix is
    /// stripped before matching.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Separator between a nested schema field and its own fields.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Build the raw input object for `schema` from `vars`.
    pub fn collect<I, K, V>(&self, schema: &Schema, vars: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut all: Vec<(String, String, String)> = vars
            .into_iter()
            .map(|(key, value)| {
                let key = key.as_ref();
                (self.normalize(key), key.to_string(), value.into())
            })
            .collect();
        all.sort();
        let all: Vec<(String, String)> = all
            .into_iter()
            .map(|(normalized, _, value)| (normalized, value))
            .collect();

        let prefix = self.normalize(&self.prefix);
        let matched: Vec<(String, String)> = all
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix.as_str())
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect();

        let input = self.assemble(schema, &matched, &all);
        tracing::debug!(
            schema = %schema.name(),
            candidates = matched.len(),
            fields = input.len(),
            "assembled settings input"
        );
        Value::Object(input)
    }

    /// Assemble and validate.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationReport`] if the assembled input is invalid.
    pub fn load<I, K, V>(&self, schema: &Arc<Schema>, vars: I) -> Result<Instance, ValidationReport>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        schema.validate(&self.collect(schema, vars))
    }

    /// Assemble from the current process environment and validate.
    /// Variables whose key or value is not valid Unicode are skipped.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationReport`] if the assembled input is invalid.
    pub fn from_env(&self, schema: &Arc<Schema>) -> Result<Instance, ValidationReport> {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        self.load(schema, vars)
    }

    fn normalize(&self, key: &str) -> String {
        if self.case_sensitive {
            key.to_string()
        } else {
            key.to_lowercase()
        }
    }

    /// `vars` are relative to the current nesting level; `all` holds every
    /// variable under its full key, for fields bound with `env`. Both are
    /// sorted, so `find` picks the same winner on every run.
    fn assemble(
        &self,
        schema: &Schema,
        vars: &[(String, String)],
        all: &[(String, String)],
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for field in schema.fields() {
            let (key, pool) = match field.env() {
                Some(var) => (self.normalize(var), all),
                None => (self.normalize(field.name()), vars),
            };
            let direct = pool.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());
            match field.ty().base() {
                FieldType::Model(nested) => {
                    let nested_prefix = format!("{key}{}", self.normalize(&self.delimiter));
                    let sub: Vec<(String, String)> = pool
                        .iter()
                        .filter_map(|(k, v)| {
                            k.strip_prefix(nested_prefix.as_str())
                                .map(|rest| (rest.to_string(), v.clone()))
                        })
                        .collect();
                    let mut object = match direct.map(parse_json) {
                        Some(Value::Object(object)) => object,
                        Some(other) if sub.is_empty() => {
                            out.insert(field.name().to_string(), other);
                            continue;
                        }
                        _ => Map::new(),
                    };
                    object.extend(self.assemble(nested, &sub, all));
                    if direct.is_some() || !object.is_empty() {
                        out.insert(field.name().to_string(), Value::Object(object));
                    }
                }
                FieldType::List(_) => {
                    if let Some(raw) = direct {
                        out.insert(field.name().to_string(), split_list(raw));
                    }
                }
                FieldType::Map(_) => {
                    if let Some(raw) = direct {
                        out.insert(field.name().to_string(), parse_json(raw));
                    }
                }
                FieldType::Scalar(_) | FieldType::Optional(_) => {
                    if let Some(raw) = direct {
                        out.insert(field.name().to_string(), Value::String(raw.to_string()));
                    }
                }
            }
        }
        out
    }
}

/// Parse as JSON, falling back to the raw string.
fn parse_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// A JSON array if the value looks like one, else comma-separated items.
fn split_list(raw: &str) -> Value {
    if raw.trim_start().starts_with('[') {
        return parse_json(raw);
    }
    Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect(),
    )
}
