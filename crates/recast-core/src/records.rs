//! Record input and output: JSON arrays, single objects and JSON Lines
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// On-disk record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// A JSON array of records, or a single record object
    Json,
    /// One record per line (`.jsonl`, `.ndjson`)
    JsonLines,
}

impl RecordFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("jsonl") | Some("ndjson") => Ok(Self::JsonLines),
            _ => Err(Error::records(
                format!(
                    "Unsupported record file '{}'. Expected .json, .jsonl or .ndjson",
                    path.display()
                ),
                None,
            )),
        }
    }
}

/// Read records from a file, detecting the layout from its extension
pub fn load_records(path: &Path) -> Result<Vec<Value>> {
    let format = RecordFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        message: format!("Failed to read '{}': {}", path.display(), e),
        source: e,
    })?;
    let records = parse_records(&content, format)?;
    debug!(path = %path.display(), count = records.len(), "Loaded records");
    Ok(records)
}

/// Parse records from text in the given layout
pub fn parse_records(content: &str, format: RecordFormat) -> Result<Vec<Value>> {
    match format {
        RecordFormat::Json => match serde_json::from_str(content)? {
            Value::Array(records) => Ok(records),
            record @ Value::Object(_) => Ok(vec![record]),
            other => Err(Error::records(
                format!("Expected a record object or an array of records, found {}", other),
                None,
            )),
        },
        RecordFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| Error::Records {
                    message: format!("Invalid JSON on line {}: {}", i + 1, e),
                    line: Some(i + 1),
                    source: Some(e),
                })
            })
            .collect(),
    }
}

/// Serialize records as JSON Lines, one compact record per line
pub fn to_json_lines(records: &[Value]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write records to a JSON Lines file
pub fn write_json_lines(path: &Path, records: &[Value]) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(to_json_lines(records)?.as_bytes())?;
    Ok(())
}
