//! Schema document loading for YAML and JSON files
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::error::{LoaderError, LoaderResult};
use crate::model::SchemaModel;
use serde_json::Value;
use std::path::Path;

/// Supported schema file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML format (.yaml, .yml)
    Yaml,
    /// JSON format (.json)
    Json,
}

impl Format {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> LoaderResult<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(LoaderError::unsupported_format(path.to_path_buf())),
        }
    }

    /// Get the primary file extension for this format
    pub fn primary_extension(&self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
        }
    }
}

/// Reads schema documents and turns them into [`SchemaModel`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaLoader;

impl SchemaLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load and parse a schema file, detecting format from extension
    pub fn load(&self, path: &Path) -> LoaderResult<SchemaModel> {
        let document = self.load_document(path)?;
        SchemaModel::parse(&document).map_err(|source| LoaderError::Schema {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a schema file as a raw JSON value without building a model
    pub fn load_document(&self, path: &Path) -> LoaderResult<Value> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoaderError::io_error(path.to_path_buf(), e))?;

        tracing::debug!(path = %path.display(), ?format, "Loading schema document");
        self.parse_content(&content, format, path)
    }

    /// Parse schema content with explicit format
    pub fn parse_content(&self, content: &str, format: Format, path: &Path) -> LoaderResult<Value> {
        match format {
            Format::Yaml => {
                let yaml_value: serde_yaml::Value = serde_yaml::from_str(content)
                    .map_err(|e| LoaderError::yaml_parse_error(path.to_path_buf(), e))?;
                serde_json::to_value(yaml_value)
                    .map_err(|e| LoaderError::json_parse_error(path.to_path_buf(), e))
            }
            Format::Json => serde_json::from_str(content)
                .map_err(|e| LoaderError::json_parse_error(path.to_path_buf(), e)),
        }
    }
}
