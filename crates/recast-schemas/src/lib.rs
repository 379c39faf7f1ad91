//! Recast Schemas - schema document model and loader
//!
//! This crate turns a JSON-Schema-like document into a [`SchemaModel`]: a flat
//! catalogue of field specs keyed by dotted path. The model is the single
//! source of truth the record engine consults for types, formats, required
//! fields and value constraints.
//!
//! Only a subset of JSON Schema is understood: `type` (including nullable
//! type lists), `properties`, `required`, `items`, `format` (`date`,
//! `date-time`), `enum`, `minimum`/`maximum`, `minItems`/`maxItems` and
//! `minLength`/`maxLength`. `$ref` and composition keywords are ignored.
//!
//! ## Quick Start
//!
//! ```rust
//! use recast_schemas::{JsonType, SchemaModel};
//! use serde_json::json;
//!
//! let model = SchemaModel::parse(&json!({
//!     "type": "object",
//!     "properties": {
//!         "title": {"type": "string"},
//!         "rating": {
//!             "type": "object",
//!             "properties": {"score": {"type": "number"}}
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! assert_eq!(model.lookup("rating.score").unwrap().json_type, JsonType::Number);
//! ```
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

pub mod error;
pub mod loader;
pub mod model;

pub use error::{LoaderError, LoaderResult, SchemaError, SchemaResult};
pub use loader::{Format, SchemaLoader};
pub use model::{
    join_path, parent_path, Constraints, FieldFormat, FieldSpec, JsonType, ObjectSpec,
    SchemaModel, PATH_SEPARATOR,
};

/// Version of the schemas crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
