//! # datagate CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use datagate_cli::check::{run_check, CheckArgs};
use datagate_cli::settings::{run_settings, SettingsArgs};
use datagate_cli::validate::{run_validate, ValidateArgs};

/// datagate: schema-driven validation for untyped data.
///
/// Validates documents and environment settings against declarative
/// schema definitions, reporting every failure with its location.
#[derive(Parser, Debug)]
#[command(name = "datagate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// Ignored when `RUST_LOG` is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit diagnostics as JSON lines instead of text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a document against a schema definition.
    Validate(ValidateArgs),

    /// Compile a schema definition and list its fields.
    Check(CheckArgs),

    /// Validate the process environment against a schema definition.
    Settings(SettingsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
        Commands::Check(args) => run_check(&args),
        Commands::Settings(args) => run_settings(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
