//! # Dump Projection
//!
//! Converts validated records back into plain `serde_json::Value` data.
//!
//! Rendering rules:
//!
//! - Records become objects in field declaration order; mappings keep their
//!   input key order.
//! - Decimals render as strings, so no precision is lost on the wire.
//! - Timestamps render as RFC 3339 with a `Z` suffix.
//! - Non-finite floats render as null.
//!
//! `exclude_unset` and `exclude_none` apply at every nesting level;
//! `include` and `exclude` name top-level fields only.

use std::collections::BTreeSet;

use datagate_core::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inclusion filters for a projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpOptions {
    /// Omit fields that were filled from defaults.
    pub exclude_unset: bool,
    /// Omit fields whose value is null.
    pub exclude_none: bool,
    /// When set, emit only these top-level fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<BTreeSet<String>>,
    /// Never emit these top-level fields.
    pub exclude: BTreeSet<String>,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_unset(mut self, yes: bool) -> Self {
        self.exclude_unset = yes;
        self
    }

    pub fn exclude_none(mut self, yes: bool) -> Self {
        self.exclude_none = yes;
        self
    }

    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    fn admits(&self, name: &str) -> bool {
        !self.exclude.contains(name)
            && self.include.as_ref().map_or(true, |only| only.contains(name))
    }

    /// The flags that propagate into nested records.
    fn nested(&self) -> DumpOptions {
        DumpOptions {
            exclude_unset: self.exclude_unset,
            exclude_none: self.exclude_none,
            include: None,
            exclude: BTreeSet::new(),
        }
    }
}

/// Project a record into a plain JSON object.
pub fn project(record: &Record, options: &DumpOptions) -> Value {
    let nested = options.nested();
    let mut out = Map::new();
    for (name, value) in record.fields() {
        if !options.admits(name) {
            continue;
        }
        if options.exclude_unset && !record.is_set(name) {
            continue;
        }
        if options.exclude_none && value.is_null() {
            continue;
        }
        out.insert(name.to_string(), render(value, &nested));
    }
    Value::Object(out)
}

/// Project a record and render it as JSON text.
///
/// # Errors
///
/// Fails only if the JSON writer fails.
pub fn dump_json(record: &Record, options: &DumpOptions, pretty: bool) -> Result<String, serde_json::Error> {
    let value = project(record, options);
    if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
}

/// Render a single value with no filtering.
pub fn plain_value(value: &FieldValue) -> Value {
    render(value, &DumpOptions::default())
}

fn render(value: &FieldValue, options: &DumpOptions) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(n) => Value::from(*n),
        FieldValue::Float(x) => Value::from(*x),
        FieldValue::Str(s) => Value::String(s.clone()),
        FieldValue::Decimal(d) => Value::String(d.to_string()),
        FieldValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        FieldValue::List(items) => Value::Array(items.iter().map(|v| render(v, options)).collect()),
        FieldValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), render(v, options)))
                .collect(),
        ),
        FieldValue::Model(record) => project(record, options),
    }
}
