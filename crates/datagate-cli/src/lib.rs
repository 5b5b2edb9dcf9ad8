//! # datagate-cli: Command-Line Interface
//!
//! A thin clap front end over `datagate-schema`.
//!
//! ## Subcommands
//!
//! - `validate`: validate a JSON/YAML document against a schema definition
//! - `check`: compile a schema definition and summarize its fields
//! - `settings`: validate the process environment against a schema definition
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers; handlers return an
//!   exit code and delegate all validation logic to `datagate-schema`.
//! - Results go to stdout as JSON; diagnostics go to stderr through
//!   `tracing`.

pub mod check;
pub mod settings;
pub mod validate;
