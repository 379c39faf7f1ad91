//! In-memory field catalogue derived from a JSON-Schema-like document
//!
//! A [`SchemaModel`] is the flat view of a schema: every typed leaf is
//! addressed by its dotted path (`rating.mpaa_rating`) and described by a
//! [`FieldSpec`]. Object properties are structural only. They show up as
//! [`ObjectSpec`] nodes and as the shared prefix of their children, never as
//! typed leaves, which keeps dotted lookups and flattening symmetric.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Separator used by dotted schema paths
pub const PATH_SEPARATOR: char = '.';

/// Declared JSON type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl JsonType {
    /// Parse a JSON Schema `type` keyword
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// The JSON Schema keyword for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Runtime type of a value; `None` for `null`.
    ///
    /// Numbers stored as integers report `Integer`, everything else `Number`.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self::Integer),
            Value::Number(_) => Some(Self::Number),
            Value::String(_) => Some(Self::String),
            Value::Array(_) => Some(Self::Array),
            Value::Object(_) => Some(Self::Object),
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Array | Self::Object)
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format hint carried by string fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldFormat {
    #[default]
    None,
    Date,
    DateTime,
    /// Shape hint only; never coerced or checked
    Email,
    /// Shape hint only; never coerced or checked
    Uri,
}

impl FieldFormat {
    /// Map a JSON Schema `format` keyword; unknown formats carry no hint
    pub fn from_keyword(keyword: Option<&str>) -> Self {
        match keyword {
            Some("date") => Self::Date,
            Some("date-time") => Self::DateTime,
            Some("email") => Self::Email,
            Some("uri") => Self::Uri,
            _ => Self::None,
        }
    }

    pub fn as_keyword(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Date => Some("date"),
            Self::DateTime => Some("date-time"),
            Self::Email => Some("email"),
            Self::Uri => Some("uri"),
        }
    }

    /// Date formats, normalized to RFC 3339 by coercion
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }
}

/// Value constraints declared alongside a field's type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl Constraints {
    fn from_node(node: &Map<String, Value>) -> Self {
        let count = |key: &str| node.get(key).and_then(Value::as_u64).map(|n| n as usize);
        Self {
            enum_values: node.get("enum").and_then(Value::as_array).cloned(),
            min_items: count("minItems"),
            max_items: count("maxItems"),
            minimum: node.get("minimum").and_then(Value::as_f64),
            maximum: node.get("maximum").and_then(Value::as_f64),
            min_length: count("minLength"),
            max_length: count("maxLength"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Describe bounds that no value of `json_type` can satisfy
    fn unsatisfiable(&self, json_type: JsonType) -> Option<String> {
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Some(format!("minimum {} exceeds maximum {}", min, max));
            }
            if json_type == JsonType::Integer && min.ceil() > max.floor() {
                return Some(format!("no integer lies between {} and {}", min, max));
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Some(format!("minLength {} exceeds maxLength {}", min, max));
            }
        }
        if let (Some(min), Some(max)) = (self.min_items, self.max_items) {
            if min > max {
                return Some(format!("minItems {} exceeds maxItems {}", min, max));
            }
        }
        None
    }
}

/// Declared shape of one field path
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Dotted path of the field; array items use `<path>[]`
    pub path: String,
    pub json_type: JsonType,
    /// Element spec, always present for arrays
    pub item_type: Option<Box<FieldSpec>>,
    pub format: FieldFormat,
    /// Listed in the parent's `required` list
    pub required: bool,
    pub constraints: Constraints,
    /// Element schema for arrays of objects that declare `properties`
    pub properties: Option<Arc<SchemaModel>>,
}

impl FieldSpec {
    /// A non-required field with no format or constraints
    pub fn new(path: impl Into<String>, json_type: JsonType) -> Self {
        Self {
            path: path.into(),
            json_type,
            item_type: None,
            format: FieldFormat::None,
            required: false,
            constraints: Constraints::default(),
            properties: None,
        }
    }

    /// An array field whose elements have the given scalar type
    pub fn array_of(path: impl Into<String>, item: JsonType) -> Self {
        let path = path.into();
        let item_spec = FieldSpec::new(format!("{}[]", path), item);
        Self::new(path, JsonType::Array).with_item_type(item_spec)
    }

    pub fn with_item_type(mut self, item: FieldSpec) -> Self {
        self.item_type = Some(Box::new(item));
        self
    }

    pub fn with_format(mut self, format: FieldFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.path
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(self.path.as_str())
    }

    /// Path of the containing object, `""` for top-level fields
    pub fn parent(&self) -> &str {
        parent_path(&self.path)
    }

    pub fn is_array(&self) -> bool {
        self.json_type == JsonType::Array
    }

    /// An `object` leaf with no declared properties
    pub fn is_opaque_object(&self) -> bool {
        self.json_type == JsonType::Object && self.properties.is_none()
    }
}

/// Structural object node; never a typed leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub path: String,
    pub required: bool,
}

/// Immutable field catalogue built from a schema document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModel {
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
    objects: Vec<ObjectSpec>,
    object_index: HashMap<String, usize>,
    /// Parent path (`""` for root) to child property names, in schema order
    children: HashMap<String, Vec<String>>,
}

impl SchemaModel {
    /// Parse a schema document into a field catalogue.
    ///
    /// The root must declare `type: object` and carry `properties`.
    pub fn parse(document: &Value) -> SchemaResult<Self> {
        let root = document.as_object().ok_or_else(|| SchemaError::NotAnObject {
            found: describe(Some(document)),
        })?;

        match root.get("type") {
            Some(Value::String(t)) if t == "object" => {}
            other => {
                return Err(SchemaError::NotObjectType {
                    path: "$".to_string(),
                    found: describe(other),
                })
            }
        }

        let mut model = Self::default();
        model.walk_object("", root)?;
        tracing::debug!(
            fields = model.fields.len(),
            objects = model.objects.len(),
            "Parsed schema model"
        );
        Ok(model)
    }

    /// Look up the spec of a leaf field by dotted path
    pub fn lookup(&self, path: &str) -> Option<&FieldSpec> {
        self.index.get(path).map(|&i| &self.fields[i])
    }

    /// Look up a structural object node by dotted path
    pub fn lookup_object(&self, path: &str) -> Option<&ObjectSpec> {
        self.object_index.get(path).map(|&i| &self.objects[i])
    }

    pub fn is_object_path(&self, path: &str) -> bool {
        self.object_index.contains_key(path)
    }

    /// True if the path names either a leaf field or an object node
    pub fn contains_path(&self, path: &str) -> bool {
        self.index.contains_key(path) || self.object_index.contains_key(path)
    }

    /// Leaf fields in schema order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    /// Object nodes in schema order
    pub fn objects(&self) -> &[ObjectSpec] {
        &self.objects
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Child property names of an object path (`""` is the root)
    pub fn children(&self, parent: &str) -> &[String] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.objects.is_empty()
    }

    fn walk_object(&mut self, parent: &str, node: &Map<String, Value>) -> SchemaResult<()> {
        let properties = node
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::missing_properties(display_path(parent)))?;
        let required = required_names(node);

        for (name, property) in properties {
            if name.contains(PATH_SEPARATOR) {
                return Err(SchemaError::InvalidPropertyName {
                    parent: display_path(parent),
                    name: name.clone(),
                });
            }
            let path = join_path(parent, name);
            let property = property
                .as_object()
                .ok_or_else(|| SchemaError::InvalidProperty { path: path.clone() })?;
            let is_required = required.contains(name.as_str());

            self.children
                .entry(parent.to_string())
                .or_default()
                .push(name.clone());

            let json_type = declared_type(&path, property)?;
            if json_type == JsonType::Object && property.contains_key("properties") {
                self.object_index.insert(path.clone(), self.objects.len());
                self.objects.push(ObjectSpec {
                    path: path.clone(),
                    required: is_required,
                });
                self.walk_object(&path, property)?;
                continue;
            }

            let spec = leaf_spec(&path, json_type, property)?.with_required(is_required);
            self.index.insert(path, self.fields.len());
            self.fields.push(spec);
        }
        Ok(())
    }
}

/// Build the spec of a typed leaf (or array item) from its schema node
fn leaf_spec(path: &str, json_type: JsonType, node: &Map<String, Value>) -> SchemaResult<FieldSpec> {
    let constraints = Constraints::from_node(node);
    if let Some(reason) = constraints.unsatisfiable(json_type) {
        return Err(SchemaError::UnsatisfiableConstraints {
            path: path.to_string(),
            reason,
        });
    }
    let mut spec = FieldSpec::new(path, json_type).with_constraints(constraints);

    match json_type {
        JsonType::String => {
            spec.format = FieldFormat::from_keyword(node.get("format").and_then(Value::as_str));
        }
        JsonType::Array => {
            spec.item_type = Some(Box::new(item_spec(path, node)?));
        }
        JsonType::Object if node.contains_key("properties") => {
            // Only reachable for array items; object properties are structural.
            let mut element = SchemaModel::default();
            element.walk_object("", node)?;
            spec.properties = Some(Arc::new(element));
        }
        _ => {}
    }
    Ok(spec)
}

fn item_spec(path: &str, node: &Map<String, Value>) -> SchemaResult<FieldSpec> {
    let items = match node.get("items") {
        Some(Value::Object(items))
            if items.contains_key("type") || items.contains_key("properties") =>
        {
            items
        }
        _ => return Err(SchemaError::missing_items(path)),
    };
    let item_path = format!("{}[]", path);
    let item_type = declared_type(&item_path, items)?;
    leaf_spec(&item_path, item_type, items)
}

/// Resolve the declared type of a node.
///
/// A type list such as `["string", "null"]` resolves to its first non-null
/// member; an untyped node with `properties` is an object.
fn declared_type(path: &str, node: &Map<String, Value>) -> SchemaResult<JsonType> {
    let keyword = match node.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        None if node.contains_key("properties") => Some("object"),
        None if node.contains_key("items") => Some("array"),
        _ => None,
    };

    keyword
        .and_then(JsonType::parse)
        .ok_or_else(|| SchemaError::UnsupportedType {
            path: path.to_string(),
            found: describe(node.get("type")),
        })
}

fn required_names(node: &Map<String, Value>) -> HashSet<&str> {
    node.get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "<missing>".to_string(),
        Some(Value::String(s)) => format!("'{}'", s),
        Some(other) => other.to_string(),
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}

/// Join a parent path and a child name with the path separator
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", parent, PATH_SEPARATOR, name)
    }
}

/// Path of the containing object, `""` for top-level paths
pub fn parent_path(path: &str) -> &str {
    path.rfind(PATH_SEPARATOR).map(|i| &path[..i]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn media_schema() -> Value {
        json!({
            "type": "object",
            "required": ["id", "genre"],
            "properties": {
                "id": {"type": "string"},
                "genre": {"type": "array", "items": {"type": "string"}},
                "release_date": {"type": "string", "format": "date"},
                "rating": {
                    "type": "object",
                    "required": ["mpaa_rating"],
                    "properties": {
                        "mpaa_rating": {"type": "string", "enum": ["G", "PG", "R"]},
                        "score": {"type": "number", "minimum": 0, "maximum": 10}
                    }
                },
                "extra": {"type": "object"}
            }
        })
    }

    #[test]
    fn test_parse_builds_dotted_paths() {
        let model = SchemaModel::parse(&media_schema()).unwrap();

        assert!(model.lookup("rating.mpaa_rating").is_some());
        assert!(model.lookup("rating").is_none());
        assert!(model.is_object_path("rating"));
        assert_eq!(model.field_count(), 6);
        assert_eq!(model.children("rating"), &["mpaa_rating", "score"]);
    }

    #[test]
    fn test_field_order_follows_document() {
        let model = SchemaModel::parse(&media_schema()).unwrap();
        let paths: Vec<&str> = model.fields().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["id", "genre", "release_date", "rating.mpaa_rating", "rating.score", "extra"]
        );
    }

    #[test]
    fn test_required_is_relative_to_parent() {
        let model = SchemaModel::parse(&media_schema()).unwrap();
        assert!(model.lookup("id").unwrap().required);
        assert!(model.lookup("rating.mpaa_rating").unwrap().required);
        assert!(!model.lookup("release_date").unwrap().required);
        assert!(!model.lookup_object("rating").unwrap().required);
    }

    #[test]
    fn test_array_carries_item_type() {
        let model = SchemaModel::parse(&media_schema()).unwrap();
        let genre = model.lookup("genre").unwrap();
        let item = genre.item_type.as_ref().unwrap();
        assert_eq!(item.json_type, JsonType::String);
        assert_eq!(item.path, "genre[]");
    }

    #[test]
    fn test_date_format_stays_scalar() {
        let model = SchemaModel::parse(&media_schema()).unwrap();
        let release = model.lookup("release_date").unwrap();
        assert_eq!(release.json_type, JsonType::String);
        assert_eq!(release.format, FieldFormat::Date);
    }

    #[test]
    fn test_object_without_properties_is_opaque_leaf() {
        let model = SchemaModel::parse(&media_schema()).unwrap();
        assert!(model.lookup("extra").unwrap().is_opaque_object());
    }

    #[test]
    fn test_constraints_are_captured() {
        let model = SchemaModel::parse(&media_schema()).unwrap();
        let score = model.lookup("rating.score").unwrap();
        assert_eq!(score.constraints.minimum, Some(0.0));
        assert_eq!(score.constraints.maximum, Some(10.0));
        let rating = model.lookup("rating.mpaa_rating").unwrap();
        assert_eq!(rating.constraints.enum_values.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_array_of_objects_carries_element_schema() {
        let schema = json!({
            "type": "object",
            "properties": {
                "persons": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {"name": {"type": "string"}, "role": {"type": "string"}}
                    }
                }
            }
        });
        let model = SchemaModel::parse(&schema).unwrap();
        let item = model.lookup("persons").unwrap().item_type.as_ref().unwrap();
        let element = item.properties.as_ref().unwrap();
        assert!(element.lookup("name").unwrap().required);
        assert!(!element.lookup("role").unwrap().required);
    }

    #[test]
    fn test_nullable_type_list_uses_first_non_null() {
        let schema = json!({
            "type": "object",
            "properties": {"count": {"type": ["null", "integer"]}}
        });
        let model = SchemaModel::parse(&schema).unwrap();
        assert_eq!(model.lookup("count").unwrap().json_type, JsonType::Integer);
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = SchemaModel::parse(&json!({"type": "array", "items": {"type": "string"}}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::NotObjectType { .. }));

        let err = SchemaModel::parse(&json!(["not", "a", "schema"])).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject { .. }));
    }

    #[test]
    fn test_rejects_unsatisfiable_bounds() {
        let parse = |property: Value| {
            SchemaModel::parse(&json!({"type": "object", "properties": {"f": property}}))
        };

        let err = parse(json!({"type": "integer", "minimum": 5.5, "maximum": 5.7})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsatisfiableConstraints { ref path, .. } if path == "f"
        ));
        assert!(parse(json!({"type": "number", "minimum": 5.5, "maximum": 5.7})).is_ok());
        assert!(parse(json!({"type": "integer", "minimum": 5, "maximum": 5})).is_ok());
        assert!(parse(json!({"type": "string", "minLength": 4, "maxLength": 3})).is_err());
        assert!(parse(json!({
            "type": "array",
            "items": {"type": "string", "maxLength": 0, "minLength": 1}
        }))
        .is_err());
    }

    #[test]
    fn test_rejects_missing_properties() {
        let err = SchemaModel::parse(&json!({"type": "object"})).unwrap_err();
        assert_eq!(err, SchemaError::missing_properties("$"));
    }

    #[test]
    fn test_rejects_array_without_items() {
        let schema = json!({
            "type": "object",
            "properties": {"tags": {"type": "array"}}
        });
        assert_eq!(
            SchemaModel::parse(&schema).unwrap_err(),
            SchemaError::missing_items("tags")
        );

        let schema = json!({
            "type": "object",
            "properties": {"tags": {"type": "array", "items": {}}}
        });
        assert_eq!(
            SchemaModel::parse(&schema).unwrap_err(),
            SchemaError::missing_items("tags")
        );
    }

    #[test]
    fn test_rejects_dotted_property_names() {
        let schema = json!({
            "type": "object",
            "properties": {"a.b": {"type": "string"}}
        });
        assert!(matches!(
            SchemaModel::parse(&schema).unwrap_err(),
            SchemaError::InvalidPropertyName { .. }
        ));
    }

    #[test]
    fn test_json_type_of_value() {
        assert_eq!(JsonType::of(&json!(1)), Some(JsonType::Integer));
        assert_eq!(JsonType::of(&json!(1.5)), Some(JsonType::Number));
        assert_eq!(JsonType::of(&json!(null)), None);
        assert_eq!(JsonType::of(&json!({})), Some(JsonType::Object));
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a.b", "c"), "a.b.c");
        assert_eq!(parent_path("a.b.c"), "a.b");
        assert_eq!(parent_path("a"), "");
    }
}
