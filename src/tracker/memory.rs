//! In-memory change tracker
//!
//! Holds entries in tracking order. Entities enter through `add` (to be
//! inserted) or `attach` (already stored), are changed through `update` or
//! `set_value`, and leave through `remove` or `detach`.

use serde_json::Value;
use tracing::debug;

use super::entry::{EntityState, EntryId, PropertyEntry, TrackedEntry};
use super::ChangeTracker;
use crate::error::{AuditError, AuditResult};
use crate::models::{Entity, EntitySchema, SchemaRegistry};
use crate::storage::backend::{GeneratedValue, Mutation};

/// Change tracker over a registry of entity schemas
#[derive(Debug)]
pub struct Tracker {
    registry: SchemaRegistry,
    entries: Vec<TrackedEntry>,
    next_id: u64,
}

impl Tracker {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Start tracking a new entity to be inserted on the next commit
    ///
    /// Generated fields still holding a placeholder value are marked
    /// temporary; the store assigns them during commit.
    pub fn add<E: Entity>(&mut self, entity: &E) -> AuditResult<EntryId> {
        let schema = self.registry.schema_of::<E>()?;
        let values = entity.to_fields()?;

        let properties = schema
            .fields
            .iter()
            .map(|descriptor| {
                let value = values.get(descriptor.name).cloned().unwrap_or(Value::Null);
                let mut property = PropertyEntry::new(*descriptor, Value::Null, value);
                property.is_temporary = descriptor.is_placeholder(&property.current);
                property
            })
            .collect();

        Ok(self.push(schema, EntityState::Added, properties))
    }

    /// Start tracking an entity that already exists in the store
    pub fn attach<E: Entity>(&mut self, entity: &E) -> AuditResult<EntryId> {
        let schema = self.registry.schema_of::<E>()?;
        let values = entity.to_fields()?;

        let mut properties = Vec::with_capacity(schema.fields.len());
        for descriptor in schema.fields {
            let value = values.get(descriptor.name).cloned().unwrap_or(Value::Null);
            if descriptor.is_key && descriptor.is_placeholder(&value) {
                return Err(AuditError::Validation(format!(
                    "Cannot attach {} without a value for key '{}'",
                    schema.entity, descriptor.name
                )));
            }
            properties.push(PropertyEntry::new(*descriptor, value.clone(), value));
        }

        Ok(self.push(schema, EntityState::Unchanged, properties))
    }

    fn push(
        &mut self,
        schema: &'static EntitySchema,
        state: EntityState,
        properties: Vec<PropertyEntry>,
    ) -> EntryId {
        let id = EntryId::new(self.next_id);
        self.next_id += 1;
        self.entries
            .push(TrackedEntry::new(id, schema, state, properties));
        debug!(entry = %id, table = schema.table, state = %state, "tracking entity");
        id
    }

    /// Replace the current values of a tracked entity
    ///
    /// Key fields must keep their values; temporary fields keep waiting for
    /// the store unless the new value is no longer a placeholder.
    pub fn update<E: Entity>(&mut self, id: EntryId, entity: &E) -> AuditResult<()> {
        let values = entity.to_fields()?;
        let entry = self.live_entry_mut(id)?;
        if !entry.is_entity(E::schema()) {
            return Err(AuditError::Tracker(format!(
                "{} holds {}, not {}",
                id,
                entry.schema().entity,
                E::schema().entity
            )));
        }

        for (name, value) in values {
            set_property(entry, &name, value)?;
        }
        Ok(())
    }

    /// Set one field's current value
    pub fn set_value(&mut self, id: EntryId, field: &str, value: Value) -> AuditResult<()> {
        let entry = self.live_entry_mut(id)?;
        set_property(entry, field, value)
    }

    /// Mark an entity for deletion
    ///
    /// An entity added since the last commit is simply dropped, since the
    /// store never saw it.
    pub fn remove(&mut self, id: EntryId) -> AuditResult<()> {
        let entry = self.live_entry_mut(id)?;
        if entry.state() != EntityState::Added {
            entry.set_state(EntityState::Deleted);
            return Ok(());
        }
        self.entries.retain(|e| e.id() != id);
        Ok(())
    }

    /// Stop tracking an entity without touching the store
    pub fn detach(&mut self, id: EntryId) -> AuditResult<()> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| AuditError::entry_not_found(id.to_string()))?;
        self.entries.remove(pos);
        Ok(())
    }

    /// Materialize the typed entity from its current values
    pub fn get<E: Entity>(&self, id: EntryId) -> AuditResult<E> {
        let entry = self
            .entry(id)
            .ok_or_else(|| AuditError::entry_not_found(id.to_string()))?;
        E::from_fields(&entry.current_values())
    }

    /// Lifecycle state of an entry, or `Detached` if it is not tracked
    pub fn state(&self, id: EntryId) -> EntityState {
        self.entry(id)
            .map(|e| e.state())
            .unwrap_or(EntityState::Detached)
    }

    /// Row changes the next commit must apply, in tracking order
    pub fn pending_mutations(&self) -> Vec<Mutation> {
        self.entries.iter().filter_map(Mutation::from_entry).collect()
    }

    /// Whether any entry has work for the next commit
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.state().is_pending())
    }

    /// Write store-assigned values into their entries
    pub fn apply_generated(&mut self, values: &[GeneratedValue]) -> AuditResult<()> {
        for generated in values {
            let entry = self
                .entries
                .iter_mut()
                .find(|e| e.id() == generated.entry)
                .ok_or_else(|| AuditError::entry_not_found(generated.entry.to_string()))?;
            let table = entry.table();
            let property = entry.property_mut(&generated.field).ok_or_else(|| {
                AuditError::Tracker(format!(
                    "Store generated unknown field '{}' for table '{}'",
                    generated.field, table
                ))
            })?;

            property.current = generated.value.clone();
            property.is_temporary = false;
        }
        Ok(())
    }

    /// Make the committed state the new baseline
    ///
    /// Added and modified entries become unchanged, deleted entries stop
    /// being tracked.
    pub fn accept_changes(&mut self) {
        self.entries.retain(|e| e.state() != EntityState::Deleted);
        for entry in &mut self.entries {
            for property in entry.properties_mut() {
                property.original = property.current.clone();
                property.is_modified = false;
            }
            entry.set_state(EntityState::Unchanged);
        }
    }

    fn live_entry_mut(&mut self, id: EntryId) -> AuditResult<&mut TrackedEntry> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| AuditError::entry_not_found(id.to_string()))?;
        if entry.state() == EntityState::Deleted {
            return Err(AuditError::Tracker(format!(
                "{} is marked for deletion",
                entry.describe()
            )));
        }
        Ok(entry)
    }
}

fn set_property(entry: &mut TrackedEntry, field: &str, value: Value) -> AuditResult<()> {
    let state = entry.state();
    let table = entry.table();
    let property = entry.property_mut(field).ok_or_else(|| {
        AuditError::Validation(format!("Table '{}' has no field '{}'", table, field))
    })?;

    if property.is_key() && state != EntityState::Added && property.current != value {
        return Err(AuditError::Validation(format!(
            "Key field '{}' of table '{}' cannot change",
            field, table
        )));
    }

    if property.is_temporary && property.descriptor.is_placeholder(&value) {
        return Ok(());
    }
    property.is_temporary = state == EntityState::Added && property.descriptor.is_placeholder(&value);
    property.current = value;
    Ok(())
}

impl ChangeTracker for Tracker {
    fn detect_changes(&mut self) {
        for entry in &mut self.entries {
            if !matches!(entry.state(), EntityState::Unchanged | EntityState::Modified) {
                continue;
            }

            let mut any_modified = false;
            for property in entry.properties_mut() {
                property.is_modified = !property.is_key() && property.original != property.current;
                any_modified |= property.is_modified;
            }

            entry.set_state(if any_modified {
                EntityState::Modified
            } else {
                EntityState::Unchanged
            });
        }
    }

    fn entries(&self) -> &[TrackedEntry] {
        &self.entries
    }
}
