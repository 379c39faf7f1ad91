//! Record validation against a schema model
//!
//! Validation classifies every schema field found in a record: conforming
//! values are checked against their constraints, non-conforming values that
//! the coercer can fix produce warnings carrying the fixed value, and values
//! that cannot conform produce errors. Keys unknown to the schema are
//! ignored.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::coercion::{is_canonical_datetime, repaired_issue, TypeCoercer};
use crate::error::type_name;
use crate::path;
use crate::report::{Issue, ValidationReport};
use recast_schemas::{parent_path, FieldSpec, JsonType, SchemaModel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Validation mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Fixable type mismatches are warnings
    #[default]
    Lenient,
    /// Every warning is escalated to an error
    Strict,
}

/// Checks records against a shared [`SchemaModel`]
#[derive(Debug, Clone)]
pub struct Validator {
    schema: Arc<SchemaModel>,
    coercer: TypeCoercer,
    mode: ValidationMode,
}

impl Validator {
    pub fn new(schema: Arc<SchemaModel>) -> Self {
        Self {
            schema,
            coercer: TypeCoercer::new(),
            mode: ValidationMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_coercer(mut self, coercer: TypeCoercer) -> Self {
        self.coercer = coercer;
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Validate one record into a sealed single-record report
    pub fn validate(&self, record: &Value) -> ValidationReport {
        let mut report = self.check(record);
        if self.mode == ValidationMode::Strict {
            report.escalate_warnings();
        }
        report.seal()
    }

    /// Validate records in order into one aggregate report
    pub fn validate_batch(&self, records: &[Value]) -> ValidationReport {
        let mut aggregate = ValidationReport::new();
        for (index, record) in records.iter().enumerate() {
            aggregate.merge_record(index, self.validate(record));
        }
        debug!(
            processed = aggregate.stats.processed,
            failed = aggregate.stats.failed,
            "Validated batch"
        );
        aggregate
    }

    /// Unsealed issues for one record, before any mode escalation
    pub(crate) fn check(&self, record: &Value) -> ValidationReport {
        let mut report = ValidationReport::new();
        if !record.is_object() {
            report.add_error(
                Issue::new("$", format!("Record must be a JSON object, found {}", type_name(record)))
                    .with_value(record.clone()),
            );
            return report;
        }
        self.check_model(record, &self.schema, &mut report);
        report
    }

    fn check_model(&self, record: &Value, model: &SchemaModel, report: &mut ValidationReport) {
        for object in model.objects() {
            if !parent_present(record, &object.path) {
                continue;
            }
            match path::get(record, &object.path) {
                Some(Value::Object(_)) => {}
                None | Some(Value::Null) if !object.required => {}
                None => report.add_error(Issue::new(
                    &object.path,
                    format!("Required object '{}' is missing", object.path),
                )),
                Some(Value::Null) => report.add_error(Issue::new(
                    &object.path,
                    format!("Required object '{}' is null", object.path),
                )),
                Some(other) => report.add_error(
                    Issue::new(
                        &object.path,
                        format!("Expected object at '{}', found {}", object.path, type_name(other)),
                    )
                    .with_value(other.clone()),
                ),
            }
        }

        for spec in model.fields() {
            if !parent_present(record, &spec.path) {
                continue;
            }
            match path::get(record, &spec.path) {
                None if spec.required => report.add_error(Issue::new(
                    &spec.path,
                    format!("Required field '{}' is missing", spec.path),
                )),
                None => {}
                Some(value) => self.check_value(value, spec, report),
            }
        }
    }

    /// A required field that is `null`, or only coerces to `null` (a null
    /// sentinel), is an error even when the coercion itself is a warning.
    fn check_value(&self, value: &Value, spec: &FieldSpec, report: &mut ValidationReport) {
        if value.is_null() {
            if spec.required {
                report.add_error(Issue::new(
                    &spec.path,
                    format!("Required field '{}' is null", spec.path),
                ));
            }
            return;
        }

        let checked = if conforms(value, spec) {
            value.clone()
        } else {
            match self.coercer.coerce(value, spec) {
                Ok(coerced) => {
                    report.add_warning(repaired_issue(spec, &coerced.value));
                    for warning in coerced.warnings {
                        report.add_warning(warning);
                    }
                    coerced.value
                }
                Err(failure) => {
                    report.add_error(
                        Issue::new(&spec.path, failure.to_string()).with_value(value.clone()),
                    );
                    return;
                }
            }
        };

        if checked.is_null() {
            if spec.required {
                report.add_error(Issue::new(
                    &spec.path,
                    format!("Required field '{}' is null", spec.path),
                ));
            }
            return;
        }

        check_constraints(&checked, spec, &spec.path, report);
        self.check_elements(&checked, spec, report);
    }

    /// Validate array-of-object elements against their element schema
    fn check_elements(&self, value: &Value, spec: &FieldSpec, report: &mut ValidationReport) {
        let Some(element_model) = spec.item_type.as_ref().and_then(|i| i.properties.as_deref()) else {
            return;
        };
        let Value::Array(elements) = value else {
            return;
        };
        for (i, element) in elements.iter().enumerate() {
            if !element.is_object() {
                continue;
            }
            let mut element_report = ValidationReport::new();
            self.check_model(element, element_model, &mut element_report);
            let prefix = format!("{}[{}]", spec.path, i);
            for issue in element_report.errors {
                report.add_error(issue.with_prefix(&prefix));
            }
            for issue in element_report.warnings {
                report.add_warning(issue.with_prefix(&prefix));
            }
        }
    }
}

/// Top-level fields always have a present parent; nested ones need an
/// object at the parent path
fn parent_present(record: &Value, field_path: &str) -> bool {
    let parent = parent_path(field_path);
    parent.is_empty() || matches!(path::get(record, parent), Some(Value::Object(_)))
}

/// Strict structural conformance without any conversion
pub fn conforms(value: &Value, spec: &FieldSpec) -> bool {
    match (spec.json_type, value) {
        (JsonType::String, Value::String(s)) => {
            !spec.format.is_temporal() || is_canonical_datetime(s)
        }
        (JsonType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (JsonType::Number, Value::Number(_)) => true,
        (JsonType::Boolean, Value::Bool(_)) => true,
        (JsonType::Object, Value::Object(_)) => true,
        (JsonType::Array, Value::Array(elements)) => match spec.item_type.as_deref() {
            Some(item) => elements.iter().all(|e| conforms(e, item)),
            None => true,
        },
        _ => false,
    }
}

fn check_constraints(value: &Value, spec: &FieldSpec, at: &str, report: &mut ValidationReport) {
    let constraints = &spec.constraints;

    if let Some(allowed) = &constraints.enum_values {
        if !allowed.contains(value) {
            report.add_error(
                Issue::new(at, format!("Value is not one of the allowed values {}", Value::Array(allowed.clone())))
                    .with_value(value.clone()),
            );
        }
    }

    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if constraints.minimum.is_some_and(|min| f < min) {
                    report.add_error(
                        Issue::new(at, format!("Value is below minimum {}", constraints.minimum.unwrap_or_default()))
                            .with_value(value.clone()),
                    );
                }
                if constraints.maximum.is_some_and(|max| f > max) {
                    report.add_error(
                        Issue::new(at, format!("Value is above maximum {}", constraints.maximum.unwrap_or_default()))
                            .with_value(value.clone()),
                    );
                }
            }
        }
        Value::String(s) => {
            let length = s.chars().count();
            if constraints.min_length.is_some_and(|min| length < min) {
                report.add_error(
                    Issue::new(at, format!("String is shorter than {} characters", constraints.min_length.unwrap_or_default()))
                        .with_value(value.clone()),
                );
            }
            if constraints.max_length.is_some_and(|max| length > max) {
                report.add_error(
                    Issue::new(at, format!("String is longer than {} characters", constraints.max_length.unwrap_or_default()))
                        .with_value(value.clone()),
                );
            }
        }
        Value::Array(elements) => {
            if constraints.min_items.is_some_and(|min| elements.len() < min) {
                report.add_error(Issue::new(
                    at,
                    format!(
                        "Array has {} items, fewer than minItems {}",
                        elements.len(),
                        constraints.min_items.unwrap_or_default()
                    ),
                ));
            }
            if constraints.max_items.is_some_and(|max| elements.len() > max) {
                report.add_error(Issue::new(
                    at,
                    format!(
                        "Array has {} items, more than maxItems {}",
                        elements.len(),
                        constraints.max_items.unwrap_or_default()
                    ),
                ));
            }
            if let Some(item) = spec.item_type.as_deref() {
                for (i, element) in elements.iter().enumerate() {
                    check_constraints(element, item, &format!("{}[{}]", at, i), report);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn media_schema() -> Arc<SchemaModel> {
        Arc::new(
            SchemaModel::parse(&json!({
                "type": "object",
                "required": ["id", "genre"],
                "properties": {
                    "id": {"type": "string"},
                    "genre": {"type": "array", "items": {"type": "string"}, "maxItems": 3},
                    "year": {"type": "integer", "minimum": 1900},
                    "release_date": {"type": "string", "format": "date"},
                    "rating": {
                        "type": "object",
                        "required": ["mpaa_rating"],
                        "properties": {
                            "mpaa_rating": {"type": "string", "enum": ["G", "PG", "R"]}
                        }
                    },
                    "persons": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["name"],
                            "properties": {"name": {"type": "string", "minLength": 1}}
                        }
                    }
                }
            }))
            .unwrap(),
        )
    }

    fn paths(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn test_valid_record() {
        let report = Validator::new(media_schema()).validate(&json!({
            "id": "m1",
            "genre": ["Comedy"],
            "release_date": "2025-01-01T00:00:00Z",
            "unknown": {"anything": true}
        }));
        assert!(report.is_valid());
        assert!(!report.has_warnings());
        assert_eq!(report.stats.passed, 1);
    }

    #[test]
    fn test_non_object_record() {
        let report = Validator::new(media_schema()).validate(&json!([1, 2]));
        assert_eq!(paths(&report.errors), vec!["$"]);
    }

    #[test]
    fn test_missing_required_fields() {
        let report = Validator::new(media_schema()).validate(&json!({"genre": []}));
        assert_eq!(paths(&report.errors), vec!["id"]);
    }

    #[test]
    fn test_nested_required_only_when_parent_present() {
        let validator = Validator::new(media_schema());
        let report = validator.validate(&json!({"id": "m", "genre": []}));
        assert!(report.is_valid());

        let report = validator.validate(&json!({"id": "m", "genre": [], "rating": {}}));
        assert_eq!(paths(&report.errors), vec!["rating.mpaa_rating"]);
    }

    #[test]
    fn test_coercible_value_is_warning() {
        let report = Validator::new(media_schema()).validate(&json!({
            "id": "m", "genre": "Comedy", "year": "2001"
        }));
        assert!(report.is_valid());
        assert_eq!(paths(&report.warnings), vec!["genre", "year"]);
        assert_eq!(report.warnings[1].value, Some(json!(2001)));
    }

    #[test]
    fn test_safe_null_required_array_is_clean_of_errors() {
        let report = Validator::new(media_schema()).validate(&json!({"id": "m", "genre": "NULL"}));
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].value, Some(json!([])));
    }

    #[test]
    fn test_required_null_or_sentinel_is_error() {
        let report = Validator::new(media_schema()).validate(&json!({"id": null, "genre": []}));
        assert_eq!(paths(&report.errors), vec!["id"]);

        let schema = SchemaModel::parse(&json!({
            "type": "object",
            "required": ["count"],
            "properties": {"count": {"type": "integer"}, "note": {"type": "integer"}}
        }))
        .unwrap();
        let report = Validator::new(Arc::new(schema)).validate(&json!({"count": "NULL", "note": "NULL"}));
        assert_eq!(paths(&report.errors), vec!["count"]);
        assert_eq!(paths(&report.warnings), vec!["count", "note"]);
    }

    #[test]
    fn test_uncoercible_value_is_error() {
        let report = Validator::new(media_schema()).validate(&json!({
            "id": "m", "genre": [], "release_date": "not-a-date"
        }));
        assert_eq!(paths(&report.errors), vec!["release_date"]);
        assert_eq!(report.errors[0].value, Some(json!("not-a-date")));
    }

    #[test]
    fn test_constraints() {
        let report = Validator::new(media_schema()).validate(&json!({
            "id": "m",
            "genre": ["a", "b", "c", "d"],
            "year": 1800,
            "rating": {"mpaa_rating": "X"}
        }));
        assert_eq!(paths(&report.errors), vec!["genre", "year", "rating.mpaa_rating"]);
    }

    #[test]
    fn test_constraints_on_coerced_value() {
        let report = Validator::new(media_schema()).validate(&json!({
            "id": "m", "genre": [], "year": "1800"
        }));
        assert_eq!(paths(&report.warnings), vec!["year"]);
        assert_eq!(paths(&report.errors), vec!["year"]);
    }

    #[test]
    fn test_array_of_objects_elements() {
        let report = Validator::new(media_schema()).validate(&json!({
            "id": "m", "genre": [], "persons": [{"name": "Ann"}, {}, {"name": ""}]
        }));
        assert_eq!(paths(&report.errors), vec!["persons[1].name", "persons[2].name"]);
    }

    #[test]
    fn test_strict_mode_escalates() {
        let validator = Validator::new(media_schema()).with_mode(ValidationMode::Strict);
        let report = validator.validate(&json!({"id": "m", "genre": "Comedy"}));
        assert!(!report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_batch_keeps_record_index() {
        let validator = Validator::new(media_schema());
        let report = validator.validate_batch(&[
            json!({"id": "a", "genre": []}),
            json!({"genre": []}),
            json!({"id": "c", "genre": "x"}),
        ]);
        assert_eq!(report.stats.processed, 3);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.with_warnings, 1);
        assert_eq!(report.errors[0].record, Some(1));
        assert_eq!(report.warnings[0].record, Some(2));
    }
}
