//! Validated instances: a record bound to the schema it satisfies.

use std::collections::BTreeSet;
use std::sync::Arc;

use datagate_core::{FieldValue, Record};
use serde_json::Value;

use crate::project::{self, DumpOptions};
use crate::schema::Schema;

/// A record guaranteed to satisfy its schema.
///
/// Only produced by [`Schema::validate`]; there is no way to mutate one in
/// place.
#[derive(Debug, Clone)]
pub struct Instance {
    schema: Arc<Schema>,
    record: Record,
}

impl Instance {
    pub(crate) fn new(schema: Arc<Schema>, record: Record) -> Self {
        Self { schema, record }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.record.get(name)
    }

    /// Names of the fields the caller supplied explicitly.
    pub fn fields_set(&self) -> &BTreeSet<String> {
        self.record.fields_set()
    }

    /// Plain-data projection under `options`.
    pub fn dump(&self, options: &DumpOptions) -> Value {
        project::project(&self.record, options)
    }

    /// JSON text projection under `options`.
    ///
    /// # Errors
    ///
    /// Fails only if the JSON writer fails.
    pub fn dump_json(&self, options: &DumpOptions, pretty: bool) -> Result<String, serde_json::Error> {
        project::dump_json(&self.record, options, pretty)
    }

    /// Field-by-field equality with another instance, ignoring provenance.
    pub fn values_eq(&self, other: &Instance) -> bool {
        self.record.values_eq(&other.record)
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}
