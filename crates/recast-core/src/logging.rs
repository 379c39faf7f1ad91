//! Structured logging setup for hosts embedding the engine
//!
//! The engine itself only emits `tracing` events and spans; this module
//! lets a host install a subscriber configured from [`LoggingConfig`].
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::IsTerminal;
use tracing::{field, Span};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format: compact, full, json
    pub format: LogFormat,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Include file and line numbers
    pub source_location: bool,
    /// Emit an event when spans close
    pub span_events: bool,
    /// Per-module level overrides
    pub module_filter: Option<HashMap<String, String>>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact format for production
    Compact,
    /// Full format with all details
    Full,
    /// JSON structured format
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            thread_ids: false,
            source_location: false,
            span_events: false,
            module_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create logging config from verbosity level
    pub fn from_verbosity(verbosity: u8) -> Self {
        let mut config = Self::default();

        match verbosity {
            0 => {
                config.level = "warn".to_string();
            }
            1 => {
                config.level = "info".to_string();
            }
            2 => {
                config.level = "debug".to_string();
                config.source_location = true;
            }
            _ => {
                config.level = "trace".to_string();
                config.format = LogFormat::Full;
                config.source_location = true;
                config.thread_ids = true;
                config.span_events = true;
            }
        }

        config
    }

    /// Apply `RUST_LOG` and `RECAST_LOG_FORMAT` overrides
    pub fn merge_with_env(&mut self) {
        self.apply_overrides(
            std::env::var("RUST_LOG").ok(),
            std::env::var("RECAST_LOG_FORMAT").ok(),
        );
    }

    fn apply_overrides(&mut self, level: Option<String>, format: Option<String>) {
        if let Some(level) = level {
            self.level = level;
        }

        if let Some(format) = format {
            match format.to_lowercase().as_str() {
                "compact" => self.format = LogFormat::Compact,
                "full" => self.format = LogFormat::Full,
                "json" => self.format = LogFormat::Json,
                _ => tracing::warn!("Invalid log format: {}, using default", format),
            }
        }
    }
}

/// Initialize the global logging system
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = create_env_filter(config)?;
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let ansi = std::io::stderr().is_terminal();

    // Each format yields a distinct subscriber type
    let installed = match config.format {
        LogFormat::Compact => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_ansi(ansi)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_span_events(span_events)
                .compact()
                .finish(),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_span_events(span_events)
                .json()
                .finish(),
        ),
        LogFormat::Full => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_ansi(ansi)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_span_events(span_events)
                .finish(),
        ),
    };

    installed.map_err(|e| Error::Configuration {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e.into()),
    })?;

    tracing::debug!(config = ?config, "Logging system initialized");
    Ok(())
}

/// Create environment filter based on configuration
fn create_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| Error::configuration(format!("Invalid log level '{}': {}", config.level, e)))?;

    if let Some(module_filters) = &config.module_filter {
        for (module, level) in module_filters {
            filter = filter.add_directive(
                format!("{}={}", module, level)
                    .parse()
                    .map_err(|e| Error::configuration(format!("Invalid filter directive: {}", e)))?,
            );
        }
    }

    Ok(filter)
}

/// Create a span for a named engine operation
pub fn create_operation_span(operation: &str, records: usize) -> Span {
    tracing::info_span!(
        "operation",
        operation = operation,
        records = records,
        duration_ms = field::Empty,
    )
}

/// Performance timing utilities
pub mod timing {
    use std::time::{Duration, Instant};
    use tracing::Span;

    /// Times an operation inside its span and logs the duration on finish
    pub struct Timer {
        start: Instant,
        span: Span,
        operation: &'static str,
    }

    impl Timer {
        pub fn new(operation: &'static str, records: usize) -> Self {
            Self {
                start: Instant::now(),
                span: super::create_operation_span(operation, records),
                operation,
            }
        }

        /// Finish the timer and log the duration
        pub fn finish(self) -> Duration {
            let duration = self.start.elapsed();
            self.span.record("duration_ms", duration.as_millis() as u64);
            let _entered = self.span.enter();
            tracing::info!(
                operation = self.operation,
                duration_ms = duration.as_millis() as u64,
                "Operation completed"
            );
            duration
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_from_verbosity() {
        let config = LoggingConfig::from_verbosity(0);
        assert_eq!(config.level, "warn");
        assert!(!config.source_location);

        let config = LoggingConfig::from_verbosity(2);
        assert_eq!(config.level, "debug");
        assert!(config.source_location);

        let config = LoggingConfig::from_verbosity(3);
        assert_eq!(config.level, "trace");
        assert_eq!(config.format, LogFormat::Full);
        assert!(config.thread_ids);
        assert!(config.span_events);
    }

    #[test]
    fn test_overrides() {
        let mut config = LoggingConfig::default();
        config.apply_overrides(Some("recast_core=trace".to_string()), Some("JSON".to_string()));
        assert_eq!(config.level, "recast_core=trace");
        assert_eq!(config.format, LogFormat::Json);

        config.apply_overrides(None, Some("fancy".to_string()));
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_env_filter_rejects_bad_directive() {
        let mut modules = HashMap::new();
        modules.insert("recast_core".to_string(), "loud".to_string());
        let config = LoggingConfig {
            module_filter: Some(modules),
            ..Default::default()
        };
        assert!(create_env_filter(&config).is_err());
    }

    #[test]
    fn test_timer_reports_duration() {
        let timer = timing::Timer::new("test", 3);
        let elapsed = timer.finish();
        assert!(elapsed < std::time::Duration::from_secs(5));
    }
}
