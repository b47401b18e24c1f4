//! Table file contents
//!
//! One JSON file per table, holding the rows and the next auto-increment
//! value. Rows are matched by their key fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::backend::{GeneratedValue, Mutation, MutationKind};
use crate::error::{AuditError, AuditResult};
use crate::models::FieldMap;

/// Serializable table data structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Next value handed out to a generated key
    #[serde(default = "first_id")]
    pub next_id: i64,

    #[serde(default)]
    pub rows: Vec<FieldMap>,
}

fn first_id() -> i64 {
    1
}

impl Default for TableData {
    fn default() -> Self {
        Self {
            next_id: first_id(),
            rows: Vec::new(),
        }
    }
}

impl TableData {
    /// Find the row identified by `key`
    pub fn find(&self, key: &FieldMap) -> Option<&FieldMap> {
        self.rows.iter().find(|row| row.matches(key))
    }

    fn position(&self, key: &FieldMap, table: &str) -> AuditResult<usize> {
        self.rows
            .iter()
            .position(|row| row.matches(key))
            .ok_or_else(|| AuditError::row_not_found(format!("{} {}", table, key)))
    }

    /// Apply one mutation, returning the values generated for an insert
    ///
    /// `committed_at` is the RFC 3339 commit instant given to generated
    /// non-key fields.
    pub fn apply(&mut self, mutation: &Mutation, committed_at: &str) -> AuditResult<Vec<GeneratedValue>> {
        match mutation.kind {
            MutationKind::Insert => self.insert(mutation, committed_at),
            MutationKind::Update => {
                let index = self.position(&mutation.key, &mutation.table)?;
                let row = &mut self.rows[index];
                for (name, value) in mutation.values.iter() {
                    row.insert(name, value.clone());
                }
                Ok(Vec::new())
            }
            MutationKind::Delete => {
                let index = self.position(&mutation.key, &mutation.table)?;
                self.rows.remove(index);
                Ok(Vec::new())
            }
        }
    }

    fn insert(&mut self, mutation: &Mutation, committed_at: &str) -> AuditResult<Vec<GeneratedValue>> {
        let mut key = mutation.key.clone();
        let mut row = mutation.key.clone();
        let mut generated = Vec::with_capacity(mutation.generated.len());

        for field in &mutation.generated {
            let value = if field.is_key {
                let id = self.next_id;
                self.next_id += 1;
                key.insert(field.name, Value::from(id));
                Value::from(id)
            } else {
                Value::String(committed_at.to_string())
            };
            row.insert(field.name, value.clone());
            generated.push(GeneratedValue {
                entry: mutation.entry,
                field: field.name.to_string(),
                value,
            });
        }

        // Explicit integer keys still advance the counter
        for (_, value) in mutation.key.iter() {
            if let Some(id) = value.as_i64() {
                self.next_id = self.next_id.max(id.saturating_add(1));
            }
        }

        if self.find(&key).is_some() {
            return Err(AuditError::Storage(format!(
                "Duplicate key {} in table '{}'",
                key, mutation.table
            )));
        }

        for (name, value) in mutation.values.iter() {
            row.insert(name, value.clone());
        }
        self.rows.push(row);
        Ok(generated)
    }
}
