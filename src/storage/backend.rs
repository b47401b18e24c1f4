//! Storage engine seam
//!
//! The audit core treats the store's commit as opaque: it hands over a
//! `CommitBatch` and gets back a `CommitReceipt` carrying the values the
//! store generated. Appending audit records after a commit is a separate
//! operation, so flushing never passes back through the commit path.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AuditResult;
use crate::models::{AuditRecord, FieldDescriptor, FieldMap};
use crate::tracker::{EntityState, EntryId, TrackedEntry};

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

/// One row change derived from a tracked entry
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Entry the change came from; generated values are reported against it
    pub entry: EntryId,
    pub table: String,
    pub kind: MutationKind,
    /// Key identifying the row (known key fields only, for inserts)
    pub key: FieldMap,
    /// Payload: all known fields for inserts, changed fields for updates
    pub values: FieldMap,
    /// Fields the store must assign on insert
    pub generated: Vec<FieldDescriptor>,
}

impl Mutation {
    /// Derive the row change for an entry, if its state calls for one
    pub fn from_entry(entry: &TrackedEntry) -> Option<Self> {
        let kind = match entry.state() {
            EntityState::Added => MutationKind::Insert,
            EntityState::Modified => MutationKind::Update,
            EntityState::Deleted => MutationKind::Delete,
            EntityState::Unchanged | EntityState::Detached => return None,
        };

        let mut key = FieldMap::new();
        let mut values = FieldMap::new();
        let mut generated = Vec::new();

        for property in entry.properties() {
            match kind {
                MutationKind::Insert => {
                    if property.is_temporary {
                        generated.push(property.descriptor);
                    } else if property.is_key() {
                        key.insert(property.name(), property.current.clone());
                    } else {
                        values.insert(property.name(), property.current.clone());
                    }
                }
                MutationKind::Update => {
                    if property.is_key() {
                        key.insert(property.name(), property.original.clone());
                    } else if property.is_modified {
                        values.insert(property.name(), property.current.clone());
                    }
                }
                MutationKind::Delete => {
                    if property.is_key() {
                        key.insert(property.name(), property.original.clone());
                    }
                }
            }
        }

        Some(Self {
            entry: entry.id(),
            table: entry.table().to_string(),
            kind,
            key,
            values,
            generated,
        })
    }
}

/// Everything one commit applies atomically
#[derive(Debug, Clone, Default)]
pub struct CommitBatch {
    pub mutations: Vec<Mutation>,
    /// Audit records finalized before the commit, written with it
    pub audit: Vec<AuditRecord>,
}

impl CommitBatch {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.audit.is_empty()
    }
}

/// A value the store assigned during commit
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedValue {
    pub entry: EntryId,
    pub field: String,
    pub value: Value,
}

/// Outcome of a successful commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReceipt {
    /// Number of rows inserted, updated or deleted
    pub rows_affected: usize,
    pub generated: Vec<GeneratedValue>,
    /// Ids assigned to the in-commit audit records, in batch order
    pub audit_ids: Vec<i64>,
}

/// A storage engine the audit context can commit through
#[async_trait]
pub trait Backend: Send + Sync {
    /// Atomically apply a batch of row changes and in-commit audit records
    async fn commit(&self, batch: CommitBatch) -> AuditResult<CommitReceipt>;

    /// Append audit records after a commit, returning their assigned ids
    async fn append_audit(&self, records: Vec<AuditRecord>) -> AuditResult<Vec<i64>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntitySchema;
    use crate::tracker::PropertyEntry;
    use serde_json::json;

    static SCHEMA: EntitySchema = EntitySchema::new(
        "Person",
        "People",
        &[
            FieldDescriptor::generated_key("id"),
            FieldDescriptor::column("Name"),
            FieldDescriptor::column("Age"),
        ],
    );

    fn entry(state: EntityState, temporary_key: bool) -> TrackedEntry {
        let mut key = PropertyEntry::new(SCHEMA.fields[0], json!(5), json!(5));
        key.is_temporary = temporary_key;
        let mut name = PropertyEntry::new(SCHEMA.fields[1], json!("Alice"), json!("Bob"));
        name.is_modified = true;
        let age = PropertyEntry::new(SCHEMA.fields[2], json!(30), json!(30));
        TrackedEntry::new(EntryId::new(1), &SCHEMA, state, vec![key, name, age])
    }

    #[test]
    fn test_insert_defers_generated_key() {
        let mutation = Mutation::from_entry(&entry(EntityState::Added, true)).unwrap();

        assert_eq!(mutation.kind, MutationKind::Insert);
        assert!(mutation.key.is_empty());
        assert_eq!(mutation.values.len(), 2);
        assert_eq!(mutation.generated, vec![SCHEMA.fields[0]]);
    }

    #[test]
    fn test_update_carries_changed_fields_only() {
        let mutation = Mutation::from_entry(&entry(EntityState::Modified, false)).unwrap();

        assert_eq!(mutation.kind, MutationKind::Update);
        assert_eq!(mutation.key.get("id"), Some(&json!(5)));
        assert_eq!(mutation.values.get("Name"), Some(&json!("Bob")));
        assert!(!mutation.values.contains("Age"));
    }

    #[test]
    fn test_delete_carries_key_only() {
        let mutation = Mutation::from_entry(&entry(EntityState::Deleted, false)).unwrap();

        assert_eq!(mutation.kind, MutationKind::Delete);
        assert_eq!(mutation.key.len(), 1);
        assert!(mutation.values.is_empty());
    }

    #[test]
    fn test_unchanged_produces_nothing() {
        assert!(Mutation::from_entry(&entry(EntityState::Unchanged, false)).is_none());
        assert!(Mutation::from_entry(&entry(EntityState::Detached, false)).is_none());
    }
}
