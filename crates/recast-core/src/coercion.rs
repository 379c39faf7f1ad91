//! Schema-directed type coercion
//!
//! [`TypeCoercer`] converts raw values to the declared type of a field. It is
//! the only place the "safe null" policy lives: `null` and the configured
//! sentinel strings become `[]` for arrays and `null` for everything else.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::error::{type_name, CoercionError};
use crate::path;
use crate::report::{Issue, ValidationReport};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use recast_schemas::{FieldSpec, JsonType, SchemaModel};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::{debug, warn};

/// Canonical output layout for `date` and `date-time` fields
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const NAIVE_DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Coercion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionOptions {
    /// Strings treated as `null` (case-sensitive)
    pub null_sentinels: Vec<String>,
}

impl Default for CoercionOptions {
    fn default() -> Self {
        Self {
            null_sentinels: vec!["NULL".to_string()],
        }
    }
}

/// A successfully coerced value plus element-level warnings
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: Value,
    pub warnings: Vec<Issue>,
}

impl Coerced {
    fn clean(value: Value) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }
}

/// Converts values to their declared field types
#[derive(Debug, Clone, Default)]
pub struct TypeCoercer {
    options: CoercionOptions,
}

/// Per-field outcome of coercing an object against a model
struct FieldsOutcome {
    value: Value,
    warnings: Vec<Issue>,
    required_failures: Vec<CoercionError>,
}

impl TypeCoercer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CoercionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CoercionOptions {
        &self.options
    }

    /// `null` or one of the configured sentinel strings
    pub fn is_null_like(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => self.options.null_sentinels.iter().any(|n| n == s),
            _ => false,
        }
    }

    /// Coerce a single value to the type declared by `spec`
    pub fn coerce(&self, value: &Value, spec: &FieldSpec) -> Result<Coerced, CoercionError> {
        if self.is_null_like(value) {
            let empty = if spec.is_array() {
                Value::Array(Vec::new())
            } else {
                Value::Null
            };
            return Ok(Coerced::clean(empty));
        }

        match spec.json_type {
            JsonType::String => self.coerce_string(value, spec).map(Coerced::clean),
            JsonType::Integer => coerce_integer(value, spec).map(Coerced::clean),
            JsonType::Number => coerce_number(value, spec).map(Coerced::clean),
            JsonType::Boolean => coerce_boolean(value, spec).map(Coerced::clean),
            JsonType::Array => self.coerce_array(value, spec),
            JsonType::Object => self.coerce_object(value, spec),
        }
    }

    /// Coerce every schema field present in `record`.
    ///
    /// Optional fields that cannot conform are removed with a warning,
    /// required ones stay in place and are reported as errors.
    pub fn coerce_record(&self, record: Value, model: &SchemaModel) -> (Value, ValidationReport) {
        let mut report = ValidationReport::new();
        if !record.is_object() {
            report.add_error(
                Issue::new("$", format!("Record must be a JSON object, found {}", type_name(&record)))
                    .with_value(record.clone()),
            );
            return (record, report);
        }

        let outcome = self.coerce_fields(record, model);
        for warning in outcome.warnings {
            report.add_warning(warning);
        }
        for failure in outcome.required_failures {
            report.add_error(
                Issue::new(failure.path.clone(), failure.to_string()).with_value(failure.value),
            );
        }
        (outcome.value, report)
    }

    fn coerce_fields(&self, mut record: Value, model: &SchemaModel) -> FieldsOutcome {
        let mut warnings = Vec::new();
        let mut required_failures = Vec::new();

        for object in model.objects() {
            let replacement = match path::get(&record, &object.path) {
                Some(Value::Object(_)) | None => continue,
                Some(value) if self.is_null_like(value) => Some(Value::Null),
                Some(value) => {
                    let failure = CoercionError::new(
                        &object.path,
                        JsonType::Object,
                        value,
                        format!("{} is not an object", type_name(value)),
                    );
                    if object.required {
                        required_failures.push(failure);
                        continue;
                    }
                    warn!(path = %object.path, "Dropping non-object value for optional object");
                    warnings.push(
                        Issue::new(&object.path, failure.to_string()).with_value(failure.value),
                    );
                    None
                }
            };
            replace(&mut record, &object.path, replacement);
        }

        for spec in model.fields() {
            let Some(value) = path::get(&record, &spec.path) else {
                continue;
            };
            let replacement = match self.coerce(value, spec) {
                Ok(coerced) if &coerced.value == value => {
                    warnings.extend(coerced.warnings);
                    continue;
                }
                Ok(coerced) => {
                    debug!(path = %spec.path, from = %value, to = %coerced.value, "Coerced value");
                    if !value.is_null() {
                        warnings.push(repaired_issue(spec, &coerced.value));
                    }
                    warnings.extend(coerced.warnings);
                    Some(coerced.value)
                }
                Err(failure) if spec.required => {
                    required_failures.push(failure);
                    continue;
                }
                Err(failure) => {
                    warn!(path = %spec.path, error = %failure, "Removing optional field that cannot be coerced");
                    warnings.push(
                        Issue::new(&spec.path, failure.to_string()).with_value(failure.value),
                    );
                    None
                }
            };
            replace(&mut record, &spec.path, replacement);
        }

        FieldsOutcome {
            value: record,
            warnings,
            required_failures,
        }
    }

    fn coerce_string(&self, value: &Value, spec: &FieldSpec) -> Result<Value, CoercionError> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(CoercionError::new(
                    &spec.path,
                    JsonType::String,
                    other,
                    format!("{} cannot be represented as a string", type_name(other)),
                ))
            }
        };

        match spec.format.as_keyword().filter(|_| spec.format.is_temporal()) {
            Some(format) => normalize_datetime(&text)
                .map(Value::String)
                .ok_or_else(|| {
                    CoercionError::format(&spec.path, format, value, "unrecognized date layout")
                }),
            None => Ok(Value::String(text)),
        }
    }

    fn coerce_array(&self, value: &Value, spec: &FieldSpec) -> Result<Coerced, CoercionError> {
        let item_spec = match spec.item_type.as_deref() {
            Some(item) => item,
            None => return Ok(Coerced::clean(value.clone())),
        };

        let elements = match value {
            Value::Array(elements) => elements,
            Value::String(s) if s.is_empty() => return Ok(Coerced::clean(Value::Array(Vec::new()))),
            single => {
                let coerced = self
                    .coerce(single, item_spec)
                    .map_err(|e| e.with_path(&spec.path))?;
                let element_path = format!("{}[0]", spec.path);
                let warnings = coerced
                    .warnings
                    .into_iter()
                    .map(|w| rebase_element_issue(w, &item_spec.path, &element_path))
                    .collect();
                let items = if coerced.value.is_null() {
                    Vec::new()
                } else {
                    vec![coerced.value]
                };
                return Ok(Coerced {
                    value: Value::Array(items),
                    warnings,
                });
            }
        };

        let mut items = Vec::with_capacity(elements.len());
        let mut warnings = Vec::new();
        for (i, element) in elements.iter().enumerate() {
            let element_path = format!("{}[{}]", spec.path, i);
            match self.coerce(element, item_spec) {
                Ok(coerced) if coerced.value.is_null() => {
                    warnings.push(
                        Issue::new(&element_path, "Dropped null array element")
                            .with_value(element.clone()),
                    );
                }
                Ok(coerced) => {
                    warnings.extend(
                        coerced
                            .warnings
                            .into_iter()
                            .map(|w| rebase_element_issue(w, &item_spec.path, &element_path)),
                    );
                    items.push(coerced.value);
                }
                Err(failure) => {
                    warnings.push(
                        Issue::new(&element_path, format!("Dropped array element: {}", failure.reason))
                            .with_value(element.clone()),
                    );
                }
            }
        }

        Ok(Coerced {
            value: Value::Array(items),
            warnings,
        })
    }

    fn coerce_object(&self, value: &Value, spec: &FieldSpec) -> Result<Coerced, CoercionError> {
        if !value.is_object() {
            return Err(CoercionError::new(
                &spec.path,
                JsonType::Object,
                value,
                format!("{} is not an object", type_name(value)),
            ));
        }

        let Some(element) = spec.properties.as_deref() else {
            return Ok(Coerced::clean(value.clone()));
        };

        let outcome = self.coerce_fields(value.clone(), element);
        match outcome.required_failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(Coerced {
                value: outcome.value,
                warnings: outcome.warnings,
            }),
        }
    }
}

/// Warning for a present value that only conforms after coercion; carries
/// the coerced value
pub(crate) fn repaired_issue(spec: &FieldSpec, coerced: &Value) -> Issue {
    Issue::new(
        &spec.path,
        format!(
            "Value does not match declared type {}; coerces to {}",
            describe_type(spec),
            coerced
        ),
    )
    .with_value(coerced.clone())
}

fn describe_type(spec: &FieldSpec) -> String {
    match spec.format.as_keyword() {
        Some(format) => format!("{} ({})", spec.json_type, format),
        None => spec.json_type.to_string(),
    }
}

/// Overwrite (`Some`) or remove (`None`) the value at an existing path
fn replace(record: &mut Value, field_path: &str, value: Option<Value>) {
    match value {
        Some(value) => {
            if let Some(slot) = path::get_mut(record, field_path) {
                *slot = value;
            }
        }
        None => {
            path::take(record, field_path);
        }
    }
}

/// Element-schema warnings carry paths relative to the element; anchor them
/// under `path[i]`.
fn rebase_element_issue(issue: Issue, item_path: &str, element_path: &str) -> Issue {
    match issue.path.strip_prefix(item_path) {
        Some(rest) => Issue {
            path: format!("{}{}", element_path, rest),
            ..issue
        },
        None => issue.with_prefix(element_path),
    }
}

/// Coerce a value with a default [`TypeCoercer`]
pub fn coerce(value: &Value, spec: &FieldSpec) -> Result<Coerced, CoercionError> {
    TypeCoercer::new().coerce(value, spec)
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim_matches(|c: char| c.is_ascii_whitespace());
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Some(Number::from(u));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn coerce_integer(value: &Value, spec: &FieldSpec) -> Result<Value, CoercionError> {
    let number = match value {
        Value::Number(n) => n.clone(),
        Value::String(s) => parse_number(s).ok_or_else(|| {
            CoercionError::new(&spec.path, JsonType::Integer, value, "not a finite number")
        })?,
        other => {
            return Err(CoercionError::new(
                &spec.path,
                JsonType::Integer,
                other,
                format!("{} is not numeric", type_name(other)),
            ))
        }
    };

    if number.is_i64() || number.is_u64() {
        return Ok(Value::Number(number));
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Ok(Value::from(f as i64))
        }
        _ => Err(CoercionError::new(
            &spec.path,
            JsonType::Integer,
            value,
            "fractional value",
        )),
    }
}

fn coerce_number(value: &Value, spec: &FieldSpec) -> Result<Value, CoercionError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => parse_number(s).map(Value::Number).ok_or_else(|| {
            CoercionError::new(&spec.path, JsonType::Number, value, "not a finite number")
        }),
        other => Err(CoercionError::new(
            &spec.path,
            JsonType::Number,
            other,
            format!("{} is not numeric", type_name(other)),
        )),
    }
}

fn coerce_boolean(value: &Value, spec: &FieldSpec) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        other => Err(CoercionError::new(
            &spec.path,
            JsonType::Boolean,
            other,
            "expected true or false",
        )),
    }
}

/// Parse the accepted date layouts and render them as RFC 3339 UTC with
/// second precision. Returns `None` for anything unrecognized.
pub fn normalize_datetime(text: &str) -> Option<String> {
    parse_datetime(text).map(|dt| dt.format(DATETIME_FORMAT).to_string())
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let midnight = |date: NaiveDate| date.and_time(NaiveTime::MIN).and_utc();
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    // Bare year and year-month: first day of the period
    match text.split_once('-') {
        None if text.len() == 4 && digits(text) => {
            return NaiveDate::from_ymd_opt(text.parse().ok()?, 1, 1).map(midnight);
        }
        Some((year, month)) if year.len() == 4 && month.len() == 2 && digits(year) && digits(month) => {
            return NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
                .map(midnight);
        }
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(midnight(date));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .map(|naive| naive.and_utc())
}

/// True if `text` is already in the canonical temporal layout
pub fn is_canonical_datetime(text: &str) -> bool {
    normalize_datetime(text).as_deref() == Some(text)
}
