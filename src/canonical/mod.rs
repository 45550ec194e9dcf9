//! Canonicalization of task and service definitions.
//!
//! Both the local and the remote definition pass through here before they
//! are compared, so that collection ordering, implicit defaults and unit
//! spellings never show up as differences. Every rule is idempotent.

pub mod service;
pub mod task_definition;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

pub use service::{canonicalize_service, ServiceForDiff};
pub use task_definition::{canonicalize_task_definition, to_number_cpu, to_number_memory};

/// Serializes a value to compact JSON for use as a deterministic sort key.
pub(crate) fn sort_key<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Serializes a canonicalized definition to the text form used for diffing.
///
/// Object keys come out sorted and `null` members are dropped. An absent
/// definition yields an empty string rather than `null`, so a missing remote
/// diffs as "everything added".
///
/// # Errors
///
/// Returns an error when the value cannot be represented as JSON.
pub fn marshal_for_diff<T: Serialize>(value: Option<&T>) -> Result<String> {
    let Some(value) = value else {
        return Ok(String::new());
    };
    let mut tree = serde_json::to_value(value)
        .map_err(|e| Error::Config(format!("failed to marshal definition: {e}")))?;
    strip_nulls(&mut tree);
    if tree.is_null() {
        return Ok(String::new());
    }
    let mut text = serde_json::to_string_pretty(&tree)
        .map_err(|e| Error::Config(format!("failed to marshal definition: {e}")))?;
    text.push('\n');
    Ok(text)
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_definition_marshals_to_empty_text() {
        let none: Option<&Value> = None;
        assert_eq!(marshal_for_diff(none).unwrap(), "");
        assert_eq!(marshal_for_diff(Some(&Value::Null)).unwrap(), "");
    }

    #[test]
    fn keys_sorted_and_nulls_dropped() {
        let v = json!({"b": 1, "a": null, "c": {"z": null, "y": [ {"k": null} ]}});
        let text = marshal_for_diff(Some(&v)).unwrap();
        assert_eq!(text, "{\n  \"b\": 1,\n  \"c\": {\n    \"y\": [\n      {}\n    ]\n  }\n}\n");
    }
}
