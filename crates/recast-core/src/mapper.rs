//! Source-to-target field mapping
//!
//! A [`FieldMapping`] is an ordered list of [`MappingRule`]s that reshape a
//! source record into a target record: read a dotted source path, apply the
//! rule's named value transforms, coerce to the rule's declared type and
//! write the result at a dotted target path. Only fields named by a rule
//! survive, unless preserve-original mode nests the whole source record
//! under a configured target.
//!
//! Mapping documents come in two forms that may be mixed per entry:
//!
//! ```json
//! {
//!   "movie_title": {"name": "title", "type": "string"},
//!   "genres": {"name": "genre", "type": "array", "split": ","},
//!   "lang": "language"
//! }
//! ```
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::coercion::TypeCoercer;
use crate::error::{Error, Result};
use crate::path;
use crate::report::{Issue, ValidationReport};
use recast_schemas::{FieldFormat, FieldSpec, JsonType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Named value transform applied before coercion
#[derive(Debug, Clone, PartialEq)]
pub enum ValueTransform {
    /// Split strings on an explicit delimiter into a trimmed array,
    /// dropping empty parts
    Split { delimiter: String },
    /// Replace values through a lookup table; unmatched values fall back to
    /// `default` when given, else pass through
    MapValues {
        values: Map<String, Value>,
        default: Option<Value>,
    },
}

impl ValueTransform {
    pub fn split(delimiter: impl Into<String>) -> Self {
        Self::Split {
            delimiter: delimiter.into(),
        }
    }

    pub fn map_values(values: Map<String, Value>, default: Option<Value>) -> Self {
        Self::MapValues { values, default }
    }

    /// Apply the transform; arrays are transformed element-wise
    pub fn apply(&self, value: Value) -> Value {
        match self {
            Self::Split { delimiter } => match value {
                Value::String(s) => Value::Array(split_parts(&s, delimiter)),
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .flat_map(|item| match item {
                            Value::String(s) => split_parts(&s, delimiter),
                            other => vec![other],
                        })
                        .collect(),
                ),
                other => other,
            },
            Self::MapValues { values, default } => match value {
                Value::Array(items) => Value::Array(
                    items.into_iter().map(|item| lookup(values, default, item)).collect(),
                ),
                other => lookup(values, default, other),
            },
        }
    }
}

fn split_parts(text: &str, delimiter: &str) -> Vec<Value> {
    text.split(delimiter)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| Value::String(part.to_string()))
        .collect()
}

fn lookup(values: &Map<String, Value>, default: &Option<Value>, value: Value) -> Value {
    let key = match &value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return value,
    };
    match values.get(&key) {
        Some(mapped) => mapped.clone(),
        None => default.clone().unwrap_or(value),
    }
}

/// One source-to-target rule
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRule {
    pub source_path: String,
    pub target_path: String,
    /// Declared type of the target, with `path == target_path`
    pub declared: FieldSpec,
    pub transforms: Vec<ValueTransform>,
    /// Coercion failures are record errors instead of warnings
    pub required: bool,
}

impl MappingRule {
    /// Start building a rule for the given source path
    pub fn builder(source_path: impl Into<String>) -> MappingRuleBuilder {
        MappingRuleBuilder::new(source_path)
    }

    /// Parse one entry of a mapping document
    pub fn from_entry(source_path: &str, entry: &Value) -> Result<Self> {
        let builder = MappingRuleBuilder::new(source_path);
        let spec = match entry {
            Value::String(target) => return builder.target_path(target.as_str()).build(),
            Value::Object(spec) => spec,
            other => {
                return Err(Error::mapping_rule(
                    source_path,
                    format!("rule must be a target name or an object, found {}", other),
                ))
            }
        };

        let target = string_key(spec, source_path, "name")?
            .ok_or_else(|| Error::mapping_rule(source_path, "rule has no target 'name'"))?;
        let mut builder = builder
            .target_path(target)
            .declared_type(type_key(spec, source_path, "type")?.unwrap_or(JsonType::String))
            .format(FieldFormat::from_keyword(string_key(spec, source_path, "format")?))
            .required(spec.get("required").and_then(Value::as_bool).unwrap_or(false));

        if let Some(items) = type_key(spec, source_path, "items")? {
            builder = builder.items(items);
        }
        if let Some(delimiter) = string_key(spec, source_path, "split")? {
            builder = builder.transform(ValueTransform::split(delimiter));
        }
        match spec.get("values") {
            None => {}
            Some(Value::Object(values)) => {
                builder = builder.transform(ValueTransform::map_values(
                    values.clone(),
                    spec.get("default").cloned(),
                ));
            }
            Some(other) => {
                return Err(Error::mapping_rule(
                    source_path,
                    format!("'values' must be an object, found {}", other),
                ))
            }
        }
        builder.build()
    }
}

fn string_key<'a>(
    spec: &'a Map<String, Value>,
    source_path: &str,
    key: &str,
) -> Result<Option<&'a str>> {
    match spec.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(Error::mapping_rule(
            source_path,
            format!("'{}' must be a string, found {}", key, other),
        )),
    }
}

fn type_key(spec: &Map<String, Value>, source_path: &str, key: &str) -> Result<Option<JsonType>> {
    string_key(spec, source_path, key)?
        .map(|t| {
            JsonType::parse(t)
                .ok_or_else(|| Error::mapping_rule(source_path, format!("unknown {} '{}'", key, t)))
        })
        .transpose()
}

/// Fluent builder for [`MappingRule`]s
#[derive(Debug, Clone)]
pub struct MappingRuleBuilder {
    source_path: String,
    target_path: Option<String>,
    declared_type: JsonType,
    items: JsonType,
    format: FieldFormat,
    transforms: Vec<ValueTransform>,
    required: bool,
}

impl MappingRuleBuilder {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            target_path: None,
            declared_type: JsonType::String,
            items: JsonType::String,
            format: FieldFormat::None,
            transforms: Vec::new(),
            required: false,
        }
    }

    /// Set the target path; defaults to the source path
    pub fn target_path(mut self, path: impl Into<String>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    pub fn declared_type(mut self, json_type: JsonType) -> Self {
        self.declared_type = json_type;
        self
    }

    /// Element type for array targets
    pub fn items(mut self, json_type: JsonType) -> Self {
        self.items = json_type;
        self
    }

    pub fn format(mut self, format: FieldFormat) -> Self {
        self.format = format;
        self
    }

    pub fn transform(mut self, transform: ValueTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn build(self) -> Result<MappingRule> {
        let target_path = self.target_path.unwrap_or_else(|| self.source_path.clone());
        for (role, p) in [("source", &self.source_path), ("target", &target_path)] {
            path::segments(p).map_err(|e| {
                Error::mapping_rule(&self.source_path, format!("invalid {} path: {}", role, e))
            })?;
        }

        let declared = match self.declared_type {
            JsonType::Array => {
                let item = FieldSpec::new(format!("{}[]", target_path), self.items)
                    .with_format(self.format);
                FieldSpec::new(target_path.clone(), JsonType::Array).with_item_type(item)
            }
            other => FieldSpec::new(target_path.clone(), other).with_format(self.format),
        }
        .with_required(self.required);

        Ok(MappingRule {
            source_path: self.source_path,
            target_path,
            declared,
            transforms: self.transforms,
            required: self.required,
        })
    }
}

/// Guards applied when a mapping is assembled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    /// Target names a mapping may not write (matched against the full
    /// target path and its first segment)
    pub reserved_targets: Vec<String>,
    /// Reject two rules writing the same target instead of last-rule-wins
    pub reject_collisions: bool,
    /// Nest the entire source record under this target path
    pub preserve_original: Option<String>,
}

/// Ordered, validated rule set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMapping {
    rules: Vec<MappingRule>,
    preserve_original: Option<String>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule (later rules win on target collisions)
    pub fn add_rule(mut self, rule: MappingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_preserve_original(mut self, target: impl Into<String>) -> Self {
        self.preserve_original = Some(target.into());
        self
    }

    /// Parse a mapping document and check it against `options`
    pub fn from_value(document: &Value, options: &MappingOptions) -> Result<Self> {
        let entries = document
            .as_object()
            .ok_or_else(|| Error::mapping("mapping document must be a JSON object"))?;

        let mut mapping = entries
            .iter()
            .map(|(source, entry)| MappingRule::from_entry(source, entry))
            .collect::<Result<Vec<_>>>()
            .map(|rules| Self {
                rules,
                preserve_original: None,
            })?;
        if let Some(target) = &options.preserve_original {
            mapping.preserve_original = Some(target.clone());
        }

        mapping.check(options)?;
        debug!(rules = mapping.rules.len(), "Loaded field mapping");
        Ok(mapping)
    }

    /// Load a mapping document from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: &std::path::Path, options: &MappingOptions) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let document: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Self::from_value(&document, options)
    }

    /// Enforce reserved targets and, when configured, collision rejection
    pub fn check(&self, options: &MappingOptions) -> Result<()> {
        let reserved: HashSet<&str> = options.reserved_targets.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();

        for rule in &self.rules {
            let head = rule.target_path.split('.').next().unwrap_or_default();
            if reserved.contains(rule.target_path.as_str()) || reserved.contains(head) {
                return Err(Error::mapping_rule(
                    &rule.source_path,
                    format!("target '{}' is reserved", rule.target_path),
                ));
            }
            if !seen.insert(rule.target_path.as_str()) {
                if options.reject_collisions {
                    return Err(Error::mapping_rule(
                        &rule.source_path,
                        format!("target '{}' is written by more than one rule", rule.target_path),
                    ));
                }
                debug!(target = %rule.target_path, "Target collision, last rule wins");
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn preserve_original(&self) -> Option<&str> {
        self.preserve_original.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Result of mapping one record
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped {
    pub record: Value,
    pub report: ValidationReport,
}

/// Applies a [`FieldMapping`] to records
#[derive(Debug, Clone)]
pub struct FieldMapper {
    mapping: Arc<FieldMapping>,
    coercer: TypeCoercer,
}

impl FieldMapper {
    pub fn new(mapping: Arc<FieldMapping>) -> Self {
        Self {
            mapping,
            coercer: TypeCoercer::new(),
        }
    }

    pub fn with_coercer(mut self, coercer: TypeCoercer) -> Self {
        self.coercer = coercer;
        self
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Map one source record into target shape
    pub fn map(&self, source: Value) -> Mapped {
        let mut target = Value::Object(Map::new());
        let mut report = ValidationReport::new();

        for rule in self.mapping.rules() {
            let Some(raw) = path::get(&source, &rule.source_path) else {
                continue;
            };
            let transformed = rule
                .transforms
                .iter()
                .fold(raw.clone(), |value, transform| transform.apply(value));

            let coerced = match self.coercer.coerce(&transformed, &rule.declared) {
                Ok(coerced) => coerced,
                Err(failure) => {
                    let issue = Issue::new(&rule.target_path, failure.to_string())
                        .with_value(raw.clone());
                    if rule.required {
                        report.add_error(issue);
                    } else {
                        warn!(source = %rule.source_path, error = %failure, "Skipping mapped field");
                        report.add_warning(issue);
                    }
                    continue;
                }
            };

            for warning in coerced.warnings {
                report.add_warning(warning);
            }
            target = write(target, &rule.target_path, coerced.value, &mut report);
        }

        if let Some(preserve) = self.mapping.preserve_original() {
            target = write(target, preserve, source, &mut report);
        }

        Mapped { record: target, report }
    }
}

/// Write a target path; a structural conflict with an earlier rule becomes
/// an error issue and leaves the target unchanged
fn write(mut target: Value, target_path: &str, value: Value, report: &mut ValidationReport) -> Value {
    if let Err(e) = path::insert(&mut target, target_path, value) {
        report.add_error(Issue::new(target_path, e.to_string()));
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(document: Value) -> FieldMapper {
        FieldMapper::new(Arc::new(
            FieldMapping::from_value(&document, &MappingOptions::default()).unwrap(),
        ))
    }

    #[test]
    fn test_typed_and_alias_forms() {
        let mapper = mapping(json!({
            "movie_title": {"name": "title", "type": "string"},
            "year": {"name": "release.year", "type": "integer"},
            "lang": "language"
        }));
        let mapped = mapper.map(json!({"movie_title": "Up", "year": "2009", "lang": "en", "x": 1}));
        assert_eq!(
            mapped.record,
            json!({"title": "Up", "release": {"year": 2009}, "language": "en"})
        );
        assert!(mapped.report.is_valid());
    }

    #[test]
    fn test_missing_source_writes_nothing() {
        let mapper = mapping(json!({"a": "b"}));
        assert_eq!(mapper.map(json!({})).record, json!({}));
    }

    #[test]
    fn test_last_rule_wins() {
        let mapper = mapping(json!({"first": "name", "second": "name"}));
        let mapped = mapper.map(json!({"first": "A", "second": "B"}));
        assert_eq!(mapped.record, json!({"name": "B"}));
    }

    #[test]
    fn test_reject_collisions() {
        let options = MappingOptions {
            reject_collisions: true,
            ..Default::default()
        };
        assert!(FieldMapping::from_value(&json!({"first": "name", "second": "name"}), &options).is_err());
    }

    #[test]
    fn test_reserved_targets() {
        let options = MappingOptions {
            reserved_targets: vec!["id".to_string()],
            ..Default::default()
        };
        assert!(FieldMapping::from_value(&json!({"movie_id": "id"}), &options).is_err());
        assert!(FieldMapping::from_value(&json!({"movie_id": "id.value"}), &options).is_err());
        assert!(FieldMapping::from_value(&json!({"movie_id": "movie_id"}), &options).is_ok());
    }

    #[test]
    fn test_no_implicit_split() {
        let mapper = mapping(json!({"genres": {"name": "genre", "type": "array"}}));
        let mapped = mapper.map(json!({"genres": "Comedy,Drama"}));
        assert_eq!(mapped.record, json!({"genre": ["Comedy,Drama"]}));
    }

    #[test]
    fn test_explicit_split_and_value_mapping() {
        let mapper = mapping(json!({
            "genres": {
                "name": "genre",
                "type": "array",
                "split": ",",
                "values": {"Sci-Fi": "Science Fiction"}
            }
        }));
        let mapped = mapper.map(json!({"genres": "Comedy, Sci-Fi,,"}));
        assert_eq!(mapped.record, json!({"genre": ["Comedy", "Science Fiction"]}));
    }

    #[test]
    fn test_value_mapping_default() {
        let mapper = mapping(json!({
            "lang": {"name": "language", "values": {"en": "English"}, "default": "Other"}
        }));
        assert_eq!(mapper.map(json!({"lang": "en"})).record, json!({"language": "English"}));
        assert_eq!(mapper.map(json!({"lang": "xx"})).record, json!({"language": "Other"}));
    }

    #[test]
    fn test_coercion_failure_is_warning_unless_required() {
        let mapper = mapping(json!({
            "year": {"name": "year", "type": "integer"},
            "count": {"name": "count", "type": "integer", "required": true}
        }));
        let mapped = mapper.map(json!({"year": "soon", "count": "many"}));
        assert_eq!(mapped.record, json!({}));
        assert_eq!(mapped.report.warnings.len(), 1);
        assert_eq!(mapped.report.errors.len(), 1);
        assert_eq!(mapped.report.errors[0].path, "count");
    }

    #[test]
    fn test_preserve_original() {
        let mapping = FieldMapping::new()
            .add_rule(MappingRule::builder("t").target_path("title").build().unwrap())
            .with_preserve_original("original");
        let mapper = FieldMapper::new(Arc::new(mapping));
        let mapped = mapper.map(json!({"t": "Up", "x": 1}));
        assert_eq!(
            mapped.record,
            json!({"title": "Up", "original": {"t": "Up", "x": 1}})
        );
    }

    #[test]
    fn test_target_conflict_is_reported() {
        let mapper = mapping(json!({"a": "x", "b": "x.y"}));
        let mapped = mapper.map(json!({"a": "scalar", "b": "nested"}));
        assert_eq!(mapped.record, json!({"x": "scalar"}));
        assert_eq!(mapped.report.errors[0].path, "x.y");
    }

    #[test]
    fn test_invalid_documents() {
        let options = MappingOptions::default();
        assert!(FieldMapping::from_value(&json!([]), &options).is_err());
        assert!(FieldMapping::from_value(&json!({"a": 1}), &options).is_err());
        assert!(FieldMapping::from_value(&json!({"a": {"type": "string"}}), &options).is_err());
        assert!(FieldMapping::from_value(&json!({"a": {"name": "b", "type": "text"}}), &options).is_err());
        assert!(FieldMapping::from_value(&json!({"a": "b..c"}), &options).is_err());
    }
}
