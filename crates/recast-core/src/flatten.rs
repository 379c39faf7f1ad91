//! Flattening records for indexing and the schema-guided inverse
//!
//! Deep flattening joins nested object keys with `_`, so schema path
//! `rating.mpaa_rating` becomes key `rating_mpaa_rating`. Because `_` may
//! also appear inside property names, unflattening needs the schema's child
//! names to decide where one segment ends.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, PathError, Result};
use crate::path;
use recast_schemas::{join_path, FieldSpec, JsonType, SchemaError, SchemaModel};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Separator placed between nested keys by deep flattening
pub const KEY_SEPARATOR: &str = "_";

/// Flattening behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenOptions {
    /// Join nested object keys into single-level keys
    pub deep: bool,
    /// Collapse arrays of strings into delimited strings
    pub arrays: bool,
    pub array_delimiter: String,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            deep: true,
            arrays: false,
            array_delimiter: " ".to_string(),
        }
    }
}

impl FlattenOptions {
    pub fn deep() -> Self {
        Self::default()
    }

    pub fn with_arrays(mut self, delimiter: impl Into<String>) -> Self {
        self.arrays = true;
        self.array_delimiter = delimiter.into();
        self
    }
}

/// Flattened key for a dotted schema path
pub fn flattened_key(schema_path: &str) -> String {
    schema_path.replace(recast_schemas::PATH_SEPARATOR, KEY_SEPARATOR)
}

/// Flatten a record. Non-object records are returned unchanged.
///
/// Two fields that join to the same key (`{"a_b": 1, "a": {"b": 2}}`) are a
/// [`PathError::Collision`]; neither value is dropped silently.
pub fn flatten(record: &Value, options: &FlattenOptions) -> std::result::Result<Value, PathError> {
    let Value::Object(map) = record else {
        return Ok(record.clone());
    };

    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        if options.deep {
            flatten_into(&mut out, key.clone(), value)?;
        } else {
            out.insert(key.clone(), value.clone());
        }
    }

    if options.arrays {
        for value in out.values_mut() {
            if let Some(joined) = join_string_array(value, &options.array_delimiter) {
                *value = Value::String(joined);
            }
        }
    }
    Ok(Value::Object(out))
}

fn flatten_into(
    out: &mut Map<String, Value>,
    key: String,
    value: &Value,
) -> std::result::Result<(), PathError> {
    match value {
        Value::Object(children) if !children.is_empty() => {
            for (child, value) in children {
                flatten_into(out, format!("{}{}{}", key, KEY_SEPARATOR, child), value)?;
            }
            Ok(())
        }
        leaf => {
            if out.contains_key(&key) {
                return Err(PathError::Collision { key });
            }
            out.insert(key, leaf.clone());
            Ok(())
        }
    }
}

fn join_string_array(value: &Value, delimiter: &str) -> Option<String> {
    let items = value.as_array().filter(|items| !items.is_empty())?;
    let parts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
    parts.map(|parts| parts.join(delimiter))
}

/// Inverse of deep flattening, guided by the schema's property names.
///
/// Keys with no parse against the schema are kept verbatim at top level; a
/// key with more than one parse is an ambiguity error.
pub fn unflatten(record: Value, schema: Option<&SchemaModel>) -> Result<Value> {
    let schema = schema.ok_or_else(|| SchemaError::schema_required("unflatten"))?;
    let Value::Object(map) = record else {
        return Ok(record);
    };

    let mut out = Value::Object(Map::new());
    for (key, value) in map {
        let mut parses = Vec::new();
        collect_parses(schema, "", &key, &mut parses);
        match parses.len() {
            0 => {
                debug!(key = %key, "Keeping unmatched flattened key");
                if let Value::Object(target) = &mut out {
                    target.insert(key, value);
                }
            }
            1 => path::insert(&mut out, &parses[0], value)?,
            _ => {
                return Err(Error::Schema(SchemaError::AmbiguousFlattenedKey {
                    key,
                    candidates: parses,
                }))
            }
        }
    }
    Ok(out)
}

/// Every complete parse of `key` below `parent`, longest child names first
fn collect_parses(schema: &SchemaModel, parent: &str, key: &str, parses: &mut Vec<String>) {
    let mut names: Vec<&String> = schema.children(parent).iter().collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));

    for name in names {
        let child = join_path(parent, name);
        if key == name.as_str() {
            parses.push(child);
        } else if let Some(rest) = key
            .strip_prefix(name.as_str())
            .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
        {
            if schema.is_object_path(&child) {
                collect_parses(schema, &child, rest, parses);
            }
        }
    }
}

/// Derive the JSON-Schema document of flattened records.
///
/// Under `arrays`, string arrays are retyped as `string`. Schema paths that
/// flatten to the same key are an ambiguity error.
pub fn flatten_schema(schema: &SchemaModel, options: &FlattenOptions) -> Result<Value> {
    let mut properties = Map::new();
    let mut sources: HashMap<String, String> = HashMap::new();
    let mut required = Vec::new();

    let mut add = |path: &str, node: Value| -> Result<String> {
        let key = if options.deep {
            flattened_key(path)
        } else {
            path.to_string()
        };
        if let Some(previous) = sources.insert(key.clone(), path.to_string()) {
            return Err(Error::Schema(SchemaError::AmbiguousFlattenedKey {
                key,
                candidates: vec![previous, path.to_string()],
            }));
        }
        properties.insert(key.clone(), node);
        Ok(key)
    };

    for spec in schema.fields() {
        let key = add(&spec.path, field_schema(spec, options))?;
        if spec.required && ancestors_required(schema, &spec.path) {
            required.push(Value::String(key));
        }
    }
    for object in schema.objects() {
        if schema.children(&object.path).is_empty() {
            add(&object.path, json!({"type": "object"}))?;
        }
    }

    let mut document = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        document["required"] = Value::Array(required);
    }
    Ok(document)
}

fn ancestors_required(schema: &SchemaModel, field_path: &str) -> bool {
    let mut parent = recast_schemas::parent_path(field_path);
    while !parent.is_empty() {
        match schema.lookup_object(parent) {
            Some(object) if object.required => parent = recast_schemas::parent_path(parent),
            _ => return false,
        }
    }
    true
}

fn field_schema(spec: &FieldSpec, options: &FlattenOptions) -> Value {
    let item = spec.item_type.as_deref();
    if options.arrays && item.map(|i| i.json_type) == Some(JsonType::String) {
        return json!({"type": "string"});
    }

    let mut node = json!({"type": spec.json_type.as_str()});
    if let Some(format) = spec.format.as_keyword() {
        node["format"] = json!(format);
    }
    if let Value::Object(constraints) = serde_json::to_value(&spec.constraints).unwrap_or_default() {
        if let Value::Object(target) = &mut node {
            target.extend(constraints);
        }
    }
    if let Some(item) = item {
        node["items"] = field_schema(item, &FlattenOptions { arrays: false, ..options.clone() });
    }
    node
}
