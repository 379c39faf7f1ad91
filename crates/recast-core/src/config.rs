//! Engine configuration
//!
//! Configuration is layered: defaults, then an optional file (`.json`,
//! `.yaml`/`.yml` or `.toml`), then `RECAST_*` environment overrides.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::coercion::CoercionOptions;
use crate::error::{Error, Result};
use crate::flatten::FlattenOptions;
use crate::generator::GeneratorOptions;
use crate::logging::LoggingConfig;
use crate::mapper::MappingOptions;
use crate::validator::ValidationMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub coercion: CoercionConfig,
    pub mapping: MappingOptions,
    pub flatten: FlattenConfig,
    pub validation: ValidationConfig,
    pub generator: GeneratorOptions,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

/// Schema-directed coercion stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub options: CoercionOptions,
}

/// Output flattening stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub options: FlattenOptions,
}

/// Validation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub mode: ValidationMode,
}

/// Batch execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads per batch; 1 runs inline
    pub workers: usize,
}

impl Default for CoercionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            options: CoercionOptions::default(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ValidationMode::Lenient,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file, format chosen by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
            message: format!("Failed to read config '{}': {}", path.display(), e),
            source: e,
        })?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(Error::configuration(format!(
                    "Unsupported config file '{}'. Expected .json, .yaml, .yml or .toml",
                    path.display()
                )))
            }
        };
        Ok(config)
    }

    /// Defaults or the given file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        Ok(config)
    }

    /// Apply `RECAST_*` environment overrides
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        self.logging.merge_with_env();
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(workers) = lookup("RECAST_WORKERS") {
            self.batch.workers = workers
                .parse()
                .map_err(|_| Error::configuration(format!("Invalid RECAST_WORKERS: {}", workers)))?;
        }

        if let Some(mode) = lookup("RECAST_VALIDATION_MODE") {
            self.validation.mode = match mode.to_lowercase().as_str() {
                "lenient" => ValidationMode::Lenient,
                "strict" => ValidationMode::Strict,
                _ => {
                    return Err(Error::configuration(format!(
                        "Invalid RECAST_VALIDATION_MODE: {}",
                        mode
                    )))
                }
            };
        }

        if let Some(sentinels) = lookup("RECAST_NULL_SENTINELS") {
            self.coercion.options.null_sentinels =
                sentinels.split(',').map(|s| s.to_string()).collect();
        }

        if let Some(delimiter) = lookup("RECAST_ARRAY_DELIMITER") {
            self.flatten.options.array_delimiter = delimiter;
        }

        if let Some(probability) = lookup("RECAST_OPTIONAL_PROBABILITY") {
            self.generator.optional_probability = probability
                .parse::<f64>()
                .ok()
                .filter(|p| (0.0..=1.0).contains(p))
                .ok_or_else(|| {
                    Error::configuration(format!("Invalid RECAST_OPTIONAL_PROBABILITY: {}", probability))
                })?;
        }

        Ok(())
    }
}
