//! # datagate-core: Foundational Types
//!
//! The leaf crate of the datagate workspace. It defines the typed values
//! that validation produces and the vocabulary every other crate uses to
//! talk about them. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Untyped in, typed out.** Raw input is always a `serde_json::Value`.
//!    Validation output is always a [`FieldValue`], a closed tagged union
//!    with one variant per declared field type. Nothing in the workspace
//!    inspects input through reflection.
//!
//! 2. **Records remember provenance.** A [`Record`] keeps its fields in
//!    declaration order and tracks which of them were explicitly supplied
//!    by the caller, so partial-update projections can omit defaults.
//!
//! 3. **Paths are structured.** Error locations are a [`Path`] of key and
//!    index segments, never a pre-formatted string.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] normalizes every accepted
//!    instant to UTC and renders it as RFC 3339 with a `Z` suffix.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `datagate-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod path;
pub mod temporal;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use error::{DatagateError, TimestampError};
pub use path::{Path, PathSegment};
pub use temporal::Timestamp;
pub use value::{FieldValue, Record, ValueKind};

/// Re-exported so downstream crates share one decimal type.
pub use rust_decimal::Decimal;
