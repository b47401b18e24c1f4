//! Tracked entries
//!
//! One `TrackedEntry` per entity the tracker holds: its lifecycle state and,
//! for every schema field, the original and current values.

use std::fmt;

use serde_json::Value;

use crate::models::{EntitySchema, FieldDescriptor, FieldMap};

/// Identifier of an entry within one tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry-{}", self.0)
    }
}

/// Lifecycle state of a tracked entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Loaded and not changed since
    Unchanged,
    /// New; will be inserted on commit
    Added,
    /// At least one field differs from its original value
    Modified,
    /// Will be deleted on commit
    Deleted,
    /// No longer tracked
    Detached,
}

impl EntityState {
    /// Whether the next commit has work to do for an entry in this state
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityState::Unchanged => write!(f, "Unchanged"),
            EntityState::Added => write!(f, "Added"),
            EntityState::Modified => write!(f, "Modified"),
            EntityState::Deleted => write!(f, "Deleted"),
            EntityState::Detached => write!(f, "Detached"),
        }
    }
}

/// Per-field view of a tracked entry
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub descriptor: FieldDescriptor,
    /// Value when the entity was attached or last committed
    pub original: Value,
    /// Value now
    pub current: Value,
    /// Current value is a placeholder the store will replace on commit
    pub is_temporary: bool,
    /// Set by change detection when `current` differs from `original`
    pub is_modified: bool,
}

impl PropertyEntry {
    pub fn new(descriptor: FieldDescriptor, original: Value, current: Value) -> Self {
        Self {
            descriptor,
            original,
            current,
            is_temporary: false,
            is_modified: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn is_key(&self) -> bool {
        self.descriptor.is_key
    }
}

/// The tracker's record of one entity
#[derive(Debug, Clone)]
pub struct TrackedEntry {
    id: EntryId,
    schema: &'static EntitySchema,
    state: EntityState,
    properties: Vec<PropertyEntry>,
}

impl TrackedEntry {
    pub fn new(
        id: EntryId,
        schema: &'static EntitySchema,
        state: EntityState,
        properties: Vec<PropertyEntry>,
    ) -> Self {
        Self {
            id,
            schema,
            state,
            properties,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Mapped storage table name
    pub fn table(&self) -> &'static str {
        self.schema.table
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }

    pub fn properties(&self) -> &[PropertyEntry] {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut [PropertyEntry] {
        &mut self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyEntry> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut PropertyEntry> {
        self.properties.iter_mut().find(|p| p.name() == name)
    }

    /// Whether this entry holds an entity of the given schema
    pub fn is_entity(&self, schema: &EntitySchema) -> bool {
        self.schema.entity == schema.entity
    }

    /// Current values of every field
    pub fn current_values(&self) -> FieldMap {
        self.properties
            .iter()
            .map(|p| (p.name(), p.current.clone()))
            .collect()
    }

    /// Original values of the key fields
    pub fn original_key(&self) -> FieldMap {
        self.properties
            .iter()
            .filter(|p| p.is_key())
            .map(|p| (p.name(), p.original.clone()))
            .collect()
    }

    /// Human-readable identity for log and error messages
    pub fn describe(&self) -> String {
        let key = self
            .properties
            .iter()
            .filter(|p| p.is_key())
            .map(|p| {
                if p.is_temporary {
                    format!("{}=<pending>", p.name())
                } else {
                    format!("{}={}", p.name(), p.current)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {{{}}}", self.schema.table, key)
    }
}
