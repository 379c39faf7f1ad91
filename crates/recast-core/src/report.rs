//! Itemized validation reports and batch statistics
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::error::{Result, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// One error or warning attached to a field path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Dotted field path, `$` for the record itself
    pub path: String,
    pub message: String,
    /// Offending (or, for coercion warnings, coerced) value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Index of the originating record inside a batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<usize>,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            value: None,
            record: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_record(mut self, index: usize) -> Self {
        self.record = Some(index);
        self
    }

    /// Re-anchor the path under an element prefix such as `persons[0]`
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() {
            self.path = if self.path == "$" {
                prefix.to_string()
            } else {
                format!("{}.{}", prefix, self.path)
            };
        }
        self
    }
}

/// Outcome of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Passed,
    PassedWithWarnings,
    Failed,
}

/// Record counters; `passed + failed == processed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub processed: usize,
    pub passed: usize,
    pub failed: usize,
    /// Records carrying at least one warning, passed or failed
    pub with_warnings: usize,
}

impl BatchStats {
    /// Count one record with the given outcome
    pub fn record(&mut self, failed: bool, has_warnings: bool) {
        self.processed += 1;
        if failed {
            self.failed += 1;
        } else {
            self.passed += 1;
        }
        if has_warnings {
            self.with_warnings += 1;
        }
    }

    pub fn merge(&mut self, other: &BatchStats) {
        self.processed += other.processed;
        self.passed += other.passed;
        self.failed += other.failed;
        self.with_warnings += other.with_warnings;
    }

    /// Fraction of processed records that passed
    pub fn pass_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.passed as f64 / self.processed as f64
        }
    }
}

/// Errors and warnings for one record, or an aggregate over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub stats: BatchStats,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, issue: Issue) {
        self.errors.push(issue);
    }

    pub fn add_warning(&mut self, issue: Issue) {
        self.warnings.push(issue);
    }

    /// Add an issue with the given severity
    pub fn push(&mut self, severity: Severity, issue: Issue) {
        match severity {
            Severity::Error => self.add_error(issue),
            Severity::Warning => self.add_warning(issue),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn status(&self) -> RecordStatus {
        if !self.is_valid() {
            RecordStatus::Failed
        } else if self.has_warnings() {
            RecordStatus::PassedWithWarnings
        } else {
            RecordStatus::Passed
        }
    }

    /// All issues tagged with their severity, errors first
    pub fn issues(&self) -> impl Iterator<Item = (Severity, &Issue)> {
        self.errors
            .iter()
            .map(|i| (Severity::Error, i))
            .chain(self.warnings.iter().map(|i| (Severity::Warning, i)))
    }

    /// Move the issues of another report for the same record into this one
    pub fn absorb(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Like [`absorb`](Self::absorb), but skip errors on paths that already
    /// carry an error
    pub fn absorb_new(&mut self, other: ValidationReport) {
        let failed: HashSet<String> = self.errors.iter().map(|i| i.path.clone()).collect();
        self.errors
            .extend(other.errors.into_iter().filter(|i| !failed.contains(&i.path)));
        self.warnings.extend(other.warnings);
    }

    /// Turn every warning into an error
    pub fn escalate_warnings(&mut self) {
        let warnings = std::mem::take(&mut self.warnings);
        self.errors.extend(warnings);
    }

    /// Finalize as a single-record report
    pub fn seal(mut self) -> Self {
        self.stats = BatchStats::default();
        self.stats.record(!self.is_valid(), self.has_warnings());
        self
    }

    /// Fold a sealed per-record report into a batch aggregate
    pub fn merge_record(&mut self, index: usize, report: ValidationReport) {
        self.stats.merge(&report.stats);
        self.errors
            .extend(report.errors.into_iter().map(|i| i.with_record(index)));
        self.warnings
            .extend(report.warnings.into_iter().map(|i| i.with_record(index)));
    }

    /// Concatenate another aggregate onto this one
    pub fn merge(&mut self, other: ValidationReport) {
        self.stats.merge(&other.stats);
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
