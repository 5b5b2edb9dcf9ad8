//! # Validate Subcommand
//!
//! Validates a JSON or YAML document against a schema definition file.
//!
//! ```bash
//! datagate validate --schema order.yaml --input order.json
//! cat order.json | datagate validate --schema order.yaml --input - --exclude-unset
//! ```
//!
//! On success the projection is printed and the exit code is 0. On failure
//! the validation report is printed as JSON and the exit code is 1.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use datagate_schema::{load_schema_file, DumpOptions, Instance, ValidationReport};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema definition file (YAML, or JSON with a `.json` extension).
    #[arg(long)]
    pub schema: PathBuf,

    /// Document to validate, or `-` for standard input.
    #[arg(long)]
    pub input: String,

    /// Omit fields that were filled from defaults.
    #[arg(long)]
    pub exclude_unset: bool,

    /// Omit fields whose value is null.
    #[arg(long)]
    pub exclude_none: bool,

    /// Pretty-print the output.
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let schema = load_schema_file(&args.schema)
        .with_context(|| format!("failed to load schema: {}", args.schema.display()))?;

    let document = read_document(&args.input)?;
    let options = DumpOptions::new()
        .exclude_unset(args.exclude_unset)
        .exclude_none(args.exclude_none);

    let outcome = schema.validate(&document);
    if let Err(report) = &outcome {
        tracing::warn!(schema = %schema.name(), errors = report.len(), "document is invalid");
    }
    let (text, code) = render_outcome(&outcome, &options, args.pretty)?;
    println!("{text}");
    Ok(code)
}

/// Read the document named by `source`, parsing it as YAML when the file
/// extension says so and as JSON otherwise.
fn read_document(source: &str) -> Result<Value> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read document from standard input")?;
        return parse_document(&text, false);
    }
    let path = Path::new(source);
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document: {}", path.display()))?;
    let is_yaml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    parse_document(&text, is_yaml)
        .with_context(|| format!("failed to parse document: {}", path.display()))
}

/// Parse document text into an untyped value.
pub fn parse_document(text: &str, is_yaml: bool) -> Result<Value> {
    if is_yaml {
        serde_yaml::from_str(text).context("invalid YAML")
    } else {
        serde_json::from_str(text).context("invalid JSON")
    }
}

/// Render a validation outcome as JSON text plus the process exit code.
pub fn render_outcome(
    outcome: &std::result::Result<Instance, ValidationReport>,
    options: &DumpOptions,
    pretty: bool,
) -> Result<(String, u8)> {
    let (value, code) = match outcome {
        Ok(instance) => (instance.dump(options), 0),
        Err(report) => (serde_json::to_value(report)?, 1),
    };
    let text = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok((text, code))
}
