//! # Check Subcommand
//!
//! Compiles a schema definition file and prints a summary of its fields,
//! so definition errors surface before any document is validated.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use datagate_schema::{project::plain_value, DefaultValue, ExtraFields, FieldType, Schema};

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema definition file to compile.
    pub schema: PathBuf,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let schema = load(&args.schema)?;
    print!("{}", describe_schema(&schema));
    Ok(0)
}

fn load(path: &std::path::Path) -> Result<std::sync::Arc<Schema>> {
    datagate_schema::load_schema_file(path)
        .with_context(|| format!("failed to compile schema: {}", path.display()))
}

/// One line per field, nested schemas indented beneath their field.
pub fn describe_schema(schema: &Schema) -> String {
    let extra = match schema.config().extra {
        ExtraFields::Ignore => "ignore",
        ExtraFields::Forbid => "forbid",
    };
    let mut out = format!(
        "{} ({} fields, strict={}, extra={extra})\n",
        schema.name(),
        schema.fields().len(),
        schema.config().strict
    );
    describe_fields(schema, 1, &mut out);
    out
}

fn describe_fields(schema: &Schema, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for field in schema.fields() {
        out.push_str(&format!("{indent}{}: {}", field.name(), field.ty()));
        match field.default() {
            None => out.push_str(" [required]"),
            Some(DefaultValue::Value(value)) => out.push_str(&format!(" = {}", plain_value(value))),
            Some(DefaultValue::Factory(_)) => out.push_str(" = <factory>"),
        }
        let constraints: Vec<&str> = field.constraints().iter().map(|c| c.name()).collect();
        if !constraints.is_empty() {
            out.push_str(&format!(" ({})", constraints.join(", ")));
        }
        if let Some(var) = field.env() {
            out.push_str(&format!(" env={var}"));
        }
        if let Some(text) = field.description() {
            out.push_str(&format!("  # {text}"));
        }
        out.push('\n');
        if let FieldType::Model(nested) = nested_model(field.ty()) {
            describe_fields(nested, depth + 1, out);
        }
    }
}

/// The innermost type, looking through optional and element wrappers.
fn nested_model(ty: &FieldType) -> &FieldType {
    match ty.base() {
        FieldType::List(element) | FieldType::Map(element) => nested_model(&element.ty),
        other => other,
    }
}
