//! Audit drafts
//!
//! A draft is the in-memory pre-image of one audit record. It may be
//! incomplete while fields the store generates are still pending.

use serde_json::Value;

use crate::models::{FieldDescriptor, FieldMap};
use crate::tracker::EntryId;

/// Transient audit record under construction
#[derive(Debug, Clone, PartialEq)]
pub struct AuditDraft {
    entry: EntryId,
    table: String,
    key_values: FieldMap,
    old_values: FieldMap,
    new_values: FieldMap,
    pending: Vec<FieldDescriptor>,
}

impl AuditDraft {
    /// Start a draft for the given tracked entry
    pub fn new(entry: EntryId, table: impl Into<String>) -> Self {
        Self {
            entry,
            table: table.into(),
            key_values: FieldMap::new(),
            old_values: FieldMap::new(),
            new_values: FieldMap::new(),
            pending: Vec::new(),
        }
    }

    /// Entry this draft describes
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_values(&self) -> &FieldMap {
        &self.key_values
    }

    pub fn old_values(&self) -> &FieldMap {
        &self.old_values
    }

    pub fn new_values(&self) -> &FieldMap {
        &self.new_values
    }

    /// Fields still waiting for a store-generated value
    pub fn pending_fields(&self) -> &[FieldDescriptor] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn set_key(&mut self, name: impl Into<String>, value: Value) {
        self.key_values.insert(name, value);
    }

    pub fn set_old(&mut self, name: impl Into<String>, value: Value) {
        self.old_values.insert(name, value);
    }

    pub fn set_new(&mut self, name: impl Into<String>, value: Value) {
        self.new_values.insert(name, value);
    }

    /// Defer a field until after the commit
    pub fn defer(&mut self, field: FieldDescriptor) {
        if !self.pending.contains(&field) {
            self.pending.push(field);
        }
    }

    /// Fill in a deferred field with its final value
    ///
    /// Key fields go to the key values; any other generated field is by
    /// definition a new value.
    pub fn resolve(&mut self, field: &FieldDescriptor, value: Value) {
        self.pending.retain(|f| f.name != field.name);
        if field.is_key {
            self.key_values.insert(field.name, value);
        } else {
            self.new_values.insert(field.name, value);
        }
    }

    /// Split into `(table, keys, old, new)` once nothing is pending
    pub(crate) fn into_parts(self) -> (String, FieldMap, FieldMap, FieldMap) {
        (self.table, self.key_values, self.old_values, self.new_values)
    }
}
