//! Human-readable change summaries for audit records
//!
//! Old and new value sets hold only the fields that matter for the
//! operation, so a summary lines them up by name: inserts list the stored
//! values, deletes list what was removed, updates list each changed field.

use serde_json::Value;

use crate::models::FieldMap;

/// Describe the change carried by a pair of old/new value sets
///
/// Returns one line per field. Fields present only in `new` are shown as
/// added, fields present only in `old` as removed.
pub fn describe_changes(old: Option<&FieldMap>, new: Option<&FieldMap>) -> Vec<String> {
    let empty = FieldMap::new();
    let old = old.unwrap_or(&empty);
    let new = new.unwrap_or(&empty);
    let mut changes = Vec::new();

    for (name, before) in old.iter() {
        match new.get(name) {
            Some(after) if after != before => changes.push(format!(
                "{}: {} -> {}",
                name,
                format_value(before),
                format_value(after)
            )),
            Some(_) => {}
            None => changes.push(format!("{}: {} -> (removed)", name, format_value(before))),
        }
    }

    for (name, after) in new.iter() {
        if !old.contains(name) {
            changes.push(format!("{}: (added) -> {}", name, format_value(after)));
        }
    }

    changes
}

/// One-line form of [`describe_changes`], `None` when nothing differs
pub fn summarize_changes(old: Option<&FieldMap>, new: Option<&FieldMap>) -> Option<String> {
    let changes = describe_changes(old, new);
    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

/// Format a stored value for display
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}
