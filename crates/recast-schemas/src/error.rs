//! Error types for schema parsing and loading
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use std::path::PathBuf;
use thiserror::Error;

/// Result type for schema model operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// The schema document (or an operation that needs one) is structurally unusable.
///
/// A `SchemaError` is always fatal to the operation that raised it: there is no
/// per-record recovery from a broken schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Root of the document is not a JSON object
    #[error("Schema document must be a JSON object, found {found}")]
    NotAnObject { found: String },

    /// Top-level or nested `type` is not `object` where an object is required
    #[error("Schema at '{path}' must declare type 'object', found {found}")]
    NotObjectType { path: String, found: String },

    /// An object node has no `properties`
    #[error("Schema at '{path}' has no 'properties'")]
    MissingProperties { path: String },

    /// An array node has no usable `items` definition
    #[error("Array field '{path}' has no usable 'items' definition")]
    MissingItems { path: String },

    /// A `type` keyword that is not one of the supported JSON types
    #[error("Field '{path}' declares unsupported type '{found}'")]
    UnsupportedType { path: String, found: String },

    /// A property node that is not an object
    #[error("Field '{path}' definition must be an object")]
    InvalidProperty { path: String },

    /// Declared bounds that no value can satisfy
    #[error("Field '{path}' has unsatisfiable constraints: {reason}")]
    UnsatisfiableConstraints { path: String, reason: String },

    /// A property name that would alias dotted path addressing
    #[error("Property name '{name}' under '{parent}' contains the path separator '.'")]
    InvalidPropertyName { parent: String, name: String },

    /// A flattened key that maps back to more than one schema path
    #[error("Flattened key '{key}' is ambiguous: matches {candidates:?}")]
    AmbiguousFlattenedKey { key: String, candidates: Vec<String> },

    /// An operation that needs a schema oracle was attempted without one
    #[error("Operation '{operation}' requires a schema")]
    SchemaRequired { operation: String },
}

impl SchemaError {
    pub fn missing_properties(path: impl Into<String>) -> Self {
        Self::MissingProperties { path: path.into() }
    }

    pub fn missing_items(path: impl Into<String>) -> Self {
        Self::MissingItems { path: path.into() }
    }

    pub fn schema_required(operation: impl Into<String>) -> Self {
        Self::SchemaRequired {
            operation: operation.into(),
        }
    }
}

/// Errors raised while reading a schema document from disk
#[derive(Error, Debug)]
pub enum LoaderError {
    /// File I/O errors
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parsing errors
    #[error("Failed to parse YAML file '{path}': {source}")]
    YamlParseError {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// JSON parsing errors
    #[error("Failed to parse JSON file '{path}': {source}")]
    JsonParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Unsupported file format
    #[error("Unsupported file format for '{path}'. Expected .yaml, .yml, or .json")]
    UnsupportedFormat { path: PathBuf },

    /// The document parsed but is not a usable schema
    #[error("Invalid schema in '{path}': {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

impl LoaderError {
    /// Create an I/O error with path context
    pub fn io_error(path: PathBuf, error: std::io::Error) -> Self {
        Self::IoError {
            path,
            source: error,
        }
    }

    /// Create a YAML parsing error with path context
    pub fn yaml_parse_error(path: PathBuf, error: serde_yaml::Error) -> Self {
        Self::YamlParseError {
            path,
            source: error,
        }
    }

    /// Create a JSON parsing error with path context
    pub fn json_parse_error(path: PathBuf, error: serde_json::Error) -> Self {
        Self::JsonParseError {
            path,
            source: error,
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(path: PathBuf) -> Self {
        Self::UnsupportedFormat { path }
    }

    /// The underlying schema error, if the file itself was readable
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            Self::Schema { source, .. } => Some(source),
            _ => None,
        }
    }
}
