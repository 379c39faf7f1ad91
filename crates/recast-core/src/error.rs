//! Error types for the Recast core library
//!
//! Schema problems are fatal to the operation that hits them, while
//! [`CoercionError`]s describe a single field that cannot conform and are
//! usually downgraded into report issues by the calling stage.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use recast_schemas::{JsonType, LoaderError, SchemaError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Main error type for Recast operations
#[derive(Error, Debug)]
pub enum Error {
    /// The schema is unusable for the requested operation
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A schema file could not be loaded
    #[error("Schema loading failed: {0}")]
    Loader(#[from] LoaderError),

    /// A single value could not be converted to its declared type
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// A dotted path could not be written
    #[error(transparent)]
    Path(#[from] PathError),

    /// Invalid mapping document or rule set
    #[error("Mapping error: {message}")]
    Mapping {
        message: String,
        source_field: Option<String>,
    },

    /// Record file could not be parsed
    #[error("Record input error: {message}")]
    Records {
        message: String,
        line: Option<usize>,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Severity of a report issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Degraded data quality; the record is still usable
    Warning,
    /// The record is unusable
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One field that cannot be converted to its declared type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot coerce {value} at '{path}' to {expected}: {reason}")]
pub struct CoercionError {
    pub path: String,
    pub expected: String,
    pub value: Value,
    pub reason: String,
}

impl CoercionError {
    pub fn new(
        path: impl Into<String>,
        expected: JsonType,
        value: &Value,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.to_string(),
            value: value.clone(),
            reason: reason.into(),
        }
    }

    /// Temporal variant naming the format instead of the bare type
    pub fn format(path: impl Into<String>, format: &str, value: &Value, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: format!("string ({})", format),
            value: value.clone(),
            reason: reason.into(),
        }
    }

    /// Re-anchor a path produced against a nested element schema
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() {
            self.path = format!("{}.{}", prefix, self.path);
        }
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Failure to address a dotted path inside a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Empty path or empty segment
    #[error("Invalid field path '{path}'")]
    InvalidPath { path: String },

    /// Two fields flatten to the same key
    #[error("Flattened key '{key}' is produced by more than one field")]
    Collision { key: String },

    /// An intermediate segment holds a non-object value
    #[error("Cannot write '{path}': '{at}' holds {found}, not an object")]
    Conflict {
        path: String,
        at: String,
        found: String,
    },
}

impl Error {
    /// Create a mapping error
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
            source_field: None,
        }
    }

    /// Create a mapping error for a specific source field
    pub fn mapping_rule(source_field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
            source_field: Some(source_field.into()),
        }
    }

    /// Create a record input error, optionally pinned to a line
    pub fn records(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::Records {
            message: message.into(),
            line,
            source: None,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error from any message
    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Internal {
            source: anyhow::anyhow!(message.clone()),
            message,
        }
    }

    /// True for errors that invalidate the schema rather than one record
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Error::Schema(_)) || matches!(self, Error::Loader(e) if e.schema_error().is_some())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Configuration {
            message: format!("YAML error: {}", err),
            source: Some(err.into()),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Configuration {
            message: format!("TOML error: {}", err),
            source: Some(err.into()),
        }
    }
}

/// JSON type name of a value, for messages
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
