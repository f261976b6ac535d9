//! Flattening of nested API records into single-level column maps.
//!
//! Nested object keys are joined with `_` into a flat namespace, in
//! depth-first key order, so `{"issue": {"id": 1}}` becomes `issue_id`.
//! Arrays and scalars pass through untouched; only objects expand.

use anyhow::Result;
use serde_json::Value;

use crate::error::ExtractError;

/// Upper bound on nesting depth. Input comes from an external API, so the
/// traversal refuses records nested deeper than any sane payload.
pub const MAX_NESTING_DEPTH: usize = 64;

const KEY_SEPARATOR: char = '_';

/// A single-level record: flattened key -> scalar or opaque value.
pub type FlatRecord = serde_json::Map<String, Value>;

/// Flatten one raw record into a [`FlatRecord`].
///
/// Iterative depth-first traversal with an explicit stack; entries are
/// pushed in reverse so pop order matches the record's own key order.
/// Empty objects contribute no entries.
pub fn flatten_record(record: Value) -> Result<FlatRecord> {
    let Value::Object(fields) = record else {
        return Err(ExtractError::upstream(format!(
            "Expected a record object from the API, got: {record}"
        ))
        .into());
    };

    let mut flat = FlatRecord::new();
    let mut stack: Vec<(String, usize, Value)> = Vec::with_capacity(fields.len());
    for (key, value) in fields.into_iter().rev() {
        stack.push((key, 0, value));
    }

    while let Some((key, depth, value)) = stack.pop() {
        match value {
            Value::Object(children) => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(ExtractError::upstream(format!(
                        "Record nesting exceeds the maximum depth of {MAX_NESTING_DEPTH} at key '{key}'"
                    ))
                    .into());
                }
                for (child_key, child_value) in children.into_iter().rev() {
                    stack.push((format!("{key}{KEY_SEPARATOR}{child_key}"), depth + 1, child_value));
                }
            }
            other => {
                flat.insert(key, other);
            }
        }
    }

    Ok(flat)
}
