//! Recast Core - schema-driven JSON record transformation and validation
//!
//! This crate interprets a JSON-Schema-like document (see `recast_schemas`)
//! and uses it to transform, validate and flatten arbitrary JSON records
//! without any hardcoded field vocabulary.
//!
//! # Main Components
//!
//! - **Path resolution**: dotted-path reads and writes over nested records
//! - **Type coercion**: schema-directed conversion with the "safe null" policy
//! - **Field mapping**: ordered source-to-target rules with typed targets
//! - **Flattening**: `_`-joined keys for indexing and the schema-guided inverse
//! - **Validation**: itemized errors and warnings per record or per batch
//! - **Sample data**: seeded, deterministic record synthesis
//! - **Pipeline**: the stages chained for single records and parallel batches
//!
//! # Example
//!
//! ```
//! use recast_core::{Pipeline, SchemaModel};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> recast_core::Result<()> {
//! let schema = Arc::new(SchemaModel::parse(&json!({
//!     "type": "object",
//!     "required": ["genre"],
//!     "properties": {
//!         "genre": {"type": "array", "items": {"type": "string"}},
//!         "release_date": {"type": "string", "format": "date"}
//!     }
//! }))?);
//!
//! let pipeline = Pipeline::builder(schema).build()?;
//! let processed = pipeline.process(json!({"genre": "NULL", "release_date": "2025"}));
//!
//! assert_eq!(
//!     processed.record,
//!     json!({"genre": [], "release_date": "2025-01-01T00:00:00Z"})
//! );
//! assert!(processed.report.is_valid());
//! # Ok(())
//! # }
//! ```
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

pub mod coercion;
pub mod config;
pub mod error;
pub mod flatten;
pub mod generator;
pub mod logging;
pub mod mapper;
pub mod path;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod validator;

// Re-export main types for convenience
pub use coercion::{coerce, normalize_datetime, CoercionOptions, Coerced, TypeCoercer};
pub use config::EngineConfig;
pub use error::{CoercionError, Error, PathError, Result, Severity};
pub use flatten::{flatten, flatten_schema, flattened_key, unflatten, FlattenOptions};
pub use generator::{generate, GeneratorOptions, SampleDataGenerator};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use mapper::{
    FieldMapper, FieldMapping, Mapped, MappingOptions, MappingRule, MappingRuleBuilder,
    ValueTransform,
};
pub use pipeline::{BatchOutput, Pipeline, PipelineBuilder, Processed};
pub use records::{load_records, parse_records, to_json_lines, RecordFormat};
pub use report::{BatchStats, Issue, RecordStatus, ValidationReport};
pub use validator::{ValidationMode, Validator};

pub use recast_schemas::{
    FieldFormat, FieldSpec, JsonType, ObjectSpec, SchemaError, SchemaLoader, SchemaModel,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
