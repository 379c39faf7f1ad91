//! Dotted-path addressing inside nested records
//!
//! Paths such as `rating.mpaa_rating` address object keys only; arrays are
//! opaque to path resolution. Reads never fail, writes create missing
//! intermediate objects but refuse to overwrite a non-object intermediate.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::error::{type_name, PathError};
use recast_schemas::{join_path, PATH_SEPARATOR};
use serde_json::{Map, Value};

/// Split a dotted path into its segments, rejecting empty segments
pub fn segments(path: &str) -> Result<Vec<&str>, PathError> {
    let parts: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    if parts.iter().any(|s| s.is_empty()) {
        return Err(PathError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(parts)
}

/// Read the value at `path`; `None` when any segment is missing or an
/// intermediate is not an object
pub fn get<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let parts = segments(path).ok()?;
    parts
        .into_iter()
        .try_fold(record, |current, segment| current.as_object()?.get(segment))
}

/// Mutable access to the value at `path`
pub fn get_mut<'a>(record: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let parts = segments(path).ok()?;
    parts
        .into_iter()
        .try_fold(record, |current, segment| current.as_object_mut()?.get_mut(segment))
}

/// True if a value (including `null`) is present at `path`
pub fn contains(record: &Value, path: &str) -> bool {
    get(record, path).is_some()
}

/// Write `value` at `path`, returning the updated record.
///
/// A `null` root is replaced by an empty object. Any other non-object on the
/// way down is a [`PathError::Conflict`].
pub fn set(mut record: Value, path: &str, value: Value) -> Result<Value, PathError> {
    insert(&mut record, path, value)?;
    Ok(record)
}

/// In-place form of [`set`]; the record is untouched on error
pub fn insert(record: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let parts = segments(path)?;
    let (last, parents) = match parts.split_last() {
        Some(split) => split,
        None => {
            return Err(PathError::InvalidPath {
                path: path.to_string(),
            })
        }
    };
    if record.is_null() {
        *record = Value::Object(Map::new());
    }

    let mut current = record;
    let mut walked = String::new();
    for segment in parents {
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            other => return Err(conflict(path, &walked, other)),
        };
        walked = join_path(&walked, segment);
    }

    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        other => Err(conflict(path, &walked, other)),
    }
}

/// Remove the value at `path`, returning the record and the removed value.
///
/// Key order of the containing object is preserved.
pub fn remove(mut record: Value, path: &str) -> (Value, Option<Value>) {
    let removed = take(&mut record, path);
    (record, removed)
}

/// In-place form of [`remove`]
pub fn take(record: &mut Value, path: &str) -> Option<Value> {
    let parts = segments(path).ok()?;
    let (last, parents) = parts.split_last()?;
    let mut current = record;
    for segment in parents {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    current.as_object_mut()?.shift_remove(*last)
}

fn conflict(path: &str, at: &str, found: &Value) -> PathError {
    PathError::Conflict {
        path: path.to_string(),
        at: if at.is_empty() { "$".to_string() } else { at.to_string() },
        found: type_name(found).to_string(),
    }
}
