//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types shared across the datagate workspace. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Validation failures are *not* errors of this kind: they are data, carried
//! by the `ValidationReport` in `datagate-schema`. The types here cover the
//! situations where no report can be produced at all (bad schema
//! definitions, unreadable files, malformed timestamps).

use thiserror::Error;

/// Top-level error type for datagate.
#[derive(Error, Debug)]
pub enum DatagateError {
    /// A timestamp could not be parsed or is out of range.
    #[error("timestamp error: {0}")]
    Timestamp(#[from] TimestampError),

    /// A schema could not be constructed.
    #[error("schema error: {0}")]
    Schema(String),

    /// A declarative schema definition could not be loaded or compiled.
    #[error("definition error: {0}")]
    Definition(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error while constructing a [`Timestamp`](crate::Timestamp).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The input does not match any accepted timestamp layout.
    #[error("invalid timestamp {input:?}: {reason}")]
    Invalid {
        /// The rejected input string.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The Unix epoch value cannot be represented.
    #[error("unix timestamp {0} is out of range")]
    OutOfRange(i64),
}
