//! # datagate-schema: Schema-Driven Validation
//!
//! Turns loosely-typed input (`serde_json::Value`) into strongly-typed,
//! constraint-checked records, and turns those records back into plain data.
//!
//! ## Building Blocks
//!
//! - [`coerce`]: pure scalar coercers, lax or strict.
//! - [`constraint`]: post-coercion predicates (bounds, length, pattern,
//!   enumeration, multiple-of).
//! - [`field`] and [`schema`]: descriptors, [`ModelConfig`], and the
//!   [`SchemaBuilder`] that checks and freezes them into an `Arc<Schema>`.
//! - [`engine`]: the validation walk. Call it through [`Schema::validate`].
//! - [`report`]: [`FieldError`], [`ValidationReport`], and the collector that
//!   never stops at the first failure.
//! - [`project`]: [`DumpOptions`] and the dump projector.
//! - [`definition`]: YAML/JSON schema definitions compiled into schemas.
//! - [`settings`]: schema input assembled from environment variables.
//!
//! ## Example
//!
//! ```
//! use datagate_schema::{Constraint, DumpOptions, Field, FieldType, Schema};
//! use serde_json::json;
//!
//! let user = Schema::builder("User")
//!     .field(Field::new("id", FieldType::int()).constraint(Constraint::ge(1)))
//!     .field(Field::new("name", FieldType::string()).default("Doe"))
//!     .build()
//!     .unwrap();
//!
//! let instance = user.validate(&json!({"id": "123"})).unwrap();
//! assert_eq!(instance.dump(&DumpOptions::new()), json!({"id": 123, "name": "Doe"}));
//! assert_eq!(instance.dump(&DumpOptions::new().exclude_unset(true)), json!({"id": 123}));
//! ```
//!
//! ## Crate Policy
//!
//! - Depends only on `datagate-core` internally.
//! - Validation is a trust boundary: input values are never logged, only
//!   schema names, field names and error counts.
//! - Schemas are immutable once built and shared through `Arc`.

pub mod coerce;
pub mod constraint;
pub mod definition;
pub mod engine;
pub mod field;
pub mod instance;
pub mod project;
pub mod report;
pub mod schema;
pub mod settings;
pub mod types;

pub use coerce::{CoerceMode, CoercionError};
pub use constraint::{Constraint, ConstraintError, Limit};
pub use definition::{load_schema_file, DefinitionError, SchemaDefinition};
pub use field::{DefaultValue, Field, FieldDescriptor, ValidationInfo};
pub use instance::Instance;
pub use project::{dump_json, project, DumpOptions};
pub use report::{ErrorKind, FieldError, ValidationReport};
pub use schema::{ExtraFields, ModelConfig, Rejection, Schema, SchemaBuilder, SchemaError, SiblingVisibility};
pub use settings::EnvSettings;
pub use types::{Element, FieldType, ScalarType};

pub use datagate_core::{FieldValue, Path, PathSegment, Record};
