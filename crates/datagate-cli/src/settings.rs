//! # Settings Subcommand
//!
//! Validates the current process environment against a schema definition,
//! e.g. to check a deployment's configuration before starting a service:
//!
//! ```bash
//! APP_PORT=8080 APP_DATABASE__URL=postgres://db datagate settings --schema app.yaml --prefix APP_
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use datagate_schema::{load_schema_file, DumpOptions, EnvSettings};

use crate::validate::render_outcome;

/// Arguments for the settings subcommand.
#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Schema definition file describing the settings.
    #[arg(long)]
    pub schema: PathBuf,

    /// Only consider variables with this prefix.
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Separator between a nested field and its own fields.
    #[arg(long, default_value = "__")]
    pub delimiter: String,

    /// Match variable names case-sensitively.
    #[arg(long)]
    pub case_sensitive: bool,

    /// Pretty-print the output.
    #[arg(long)]
    pub pretty: bool,
}

impl SettingsArgs {
    pub fn env_settings(&self) -> EnvSettings {
        EnvSettings::new()
            .prefix(self.prefix.as_str())
            .delimiter(self.delimiter.as_str())
            .case_sensitive(self.case_sensitive)
    }
}

/// Execute the settings subcommand.
pub fn run_settings(args: &SettingsArgs) -> Result<u8> {
    let schema = load_schema_file(&args.schema)
        .with_context(|| format!("failed to load schema: {}", args.schema.display()))?;

    let outcome = args.env_settings().from_env(&schema);
    match &outcome {
        Ok(instance) => tracing::info!(
            schema = %schema.name(),
            supplied = instance.fields_set().len(),
            "settings are valid"
        ),
        Err(report) => tracing::warn!(
            schema = %schema.name(),
            errors = report.len(),
            "settings are invalid"
        ),
    }
    let (text, code) = render_outcome(&outcome, &DumpOptions::new(), args.pretty)?;
    println!("{text}");
    Ok(code)
}
