//! Durable audit record
//!
//! The persisted shape of one audited mutation. Key, old and new values are
//! stored as JSON object text; old and new are absent when empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::field_map::FieldMap;
use super::schema::{Entity, EntitySchema, FieldDescriptor};
use crate::error::AuditResult;

/// Kind of mutation a record describes, inferred from its payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Insert => write!(f, "INSERT"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single audit record
///
/// Created once per mutated entity per commit and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Store-generated identifier; `None` until the audit store appends it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Source table name
    pub table: String,

    /// When the record was finalized (UTC)
    pub timestamp: DateTime<Utc>,

    /// JSON object of primary key field → value
    pub key_values: String,

    /// JSON object of pre-change values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_values: Option<String>,

    /// JSON object of post-change values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_values: Option<String>,
}

impl AuditRecord {
    /// Parse the key values back into a field map
    pub fn key_map(&self) -> AuditResult<FieldMap> {
        FieldMap::from_json(&self.key_values)
    }

    /// Parse the old values, if any
    pub fn old_map(&self) -> AuditResult<Option<FieldMap>> {
        self.old_values
            .as_deref()
            .map(FieldMap::from_json)
            .transpose()
    }

    /// Parse the new values, if any
    pub fn new_map(&self) -> AuditResult<Option<FieldMap>> {
        self.new_values
            .as_deref()
            .map(FieldMap::from_json)
            .transpose()
    }

    /// Infer the operation from which payloads are present
    ///
    /// Returns `None` for a record carrying keys only, which happens when an
    /// insert or delete touched no payload columns.
    pub fn operation(&self) -> Option<Operation> {
        match (&self.old_values, &self.new_values) {
            (None, Some(_)) => Some(Operation::Insert),
            (Some(_), Some(_)) => Some(Operation::Update),
            (Some(_), None) => Some(Operation::Delete),
            (None, None) => None,
        }
    }

    /// Parse every stored blob, failing on the first one that does not
    /// round-trip to a field map
    pub fn verify(&self) -> AuditResult<()> {
        self.key_map()?;
        self.old_map()?;
        self.new_map()?;
        Ok(())
    }

    /// Format the record as a one-line summary
    pub fn format_human_readable(&self) -> String {
        let operation = self
            .operation()
            .map(|op| op.to_string())
            .unwrap_or_else(|| "KEYS".to_string());
        let id = self
            .id
            .map(|id| format!("#{}", id))
            .unwrap_or_else(|| "#-".to_string());

        format!(
            "{} [{}] {} {} {}",
            id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            operation,
            self.table,
            self.key_values
        )
    }
}

impl Entity for AuditRecord {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "AuditRecord",
            "HistoricalData",
            &[
                FieldDescriptor::generated_key("id"),
                FieldDescriptor::column("table"),
                FieldDescriptor::column("timestamp"),
                FieldDescriptor::column("keyValues"),
                FieldDescriptor::column("oldValues"),
                FieldDescriptor::column("newValues"),
            ],
        );
        &SCHEMA
    }
}
