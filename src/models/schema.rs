//! Static entity schemas
//!
//! Every entity type declares its table and an ordered list of field
//! descriptors once, as a `static`. The change tracker and the snapshot
//! builder read these descriptors instead of reflecting over values at
//! runtime.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::field_map::FieldMap;
use crate::error::{AuditError, AuditResult};

/// Metadata for one field of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field (column) name, as the entity serializes it
    pub name: &'static str,
    /// Part of the primary key
    pub is_key: bool,
    /// Value is assigned by the store at commit time
    pub is_generated: bool,
}

impl FieldDescriptor {
    /// An ordinary payload column
    pub const fn column(name: &'static str) -> Self {
        Self {
            name,
            is_key: false,
            is_generated: false,
        }
    }

    /// A caller-supplied primary key column
    pub const fn key(name: &'static str) -> Self {
        Self {
            name,
            is_key: true,
            is_generated: false,
        }
    }

    /// A primary key column assigned by the store (auto-increment)
    pub const fn generated_key(name: &'static str) -> Self {
        Self {
            name,
            is_key: true,
            is_generated: true,
        }
    }

    /// A payload column assigned by the store
    pub const fn generated(name: &'static str) -> Self {
        Self {
            name,
            is_key: false,
            is_generated: true,
        }
    }

    /// Whether `value` is a stand-in for a value the store has yet to assign
    pub fn is_placeholder(&self, value: &Value) -> bool {
        if !self.is_generated {
            return false;
        }
        match value {
            Value::Null => true,
            Value::Number(n) => n.as_i64() == Some(0),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Schema of one entity type: its name, mapped table and ordered fields
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity type name
    pub entity: &'static str,
    /// Storage table the entity maps to
    pub table: &'static str,
    /// Fields in declaration order
    pub fields: &'static [FieldDescriptor],
}

impl EntitySchema {
    pub const fn new(
        entity: &'static str,
        table: &'static str,
        fields: &'static [FieldDescriptor],
    ) -> Self {
        Self {
            entity,
            table,
            fields,
        }
    }

    /// Look up a field descriptor by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Primary key descriptors in declaration order
    pub fn key_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_key)
    }

    /// Check the schema is usable: at least one key, no duplicate names
    pub fn validate(&self) -> AuditResult<()> {
        if self.key_fields().next().is_none() {
            return Err(AuditError::Validation(format!(
                "Entity '{}' declares no primary key",
                self.entity
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(AuditError::Validation(format!(
                    "Entity '{}' declares field '{}' twice",
                    self.entity, field.name
                )));
            }
        }
        Ok(())
    }
}

/// A typed value that can be tracked and audited
///
/// Implementors provide a `static` schema; conversion to and from field
/// values goes through serde, so field names must match the serialized names.
///
/// ```rust,ignore
/// impl Entity for Canvas {
///     fn schema() -> &'static EntitySchema {
///         static SCHEMA: EntitySchema = EntitySchema::new(
///             "Canvas",
///             "Canvas",
///             &[FieldDescriptor::generated_key("CanvasID"), FieldDescriptor::column("Name")],
///         );
///         &SCHEMA
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned {
    /// The static schema for this entity type
    fn schema() -> &'static EntitySchema;

    /// Field values in schema order
    fn to_fields(&self) -> AuditResult<FieldMap> {
        let schema = Self::schema();
        let value = serde_json::to_value(self).map_err(|e| {
            AuditError::Json(format!("Failed to serialize {}: {}", schema.entity, e))
        })?;

        let mut object = match value {
            Value::Object(obj) => obj,
            _ => {
                return Err(AuditError::Json(format!(
                    "{} did not serialize to an object",
                    schema.entity
                )))
            }
        };

        let mut fields = FieldMap::new();
        for descriptor in schema.fields {
            let value = object.remove(descriptor.name).unwrap_or(Value::Null);
            fields.insert(descriptor.name, value);
        }

        if let Some(extra) = object.keys().next() {
            return Err(AuditError::Validation(format!(
                "{} serialized field '{}' which its schema does not declare",
                schema.entity, extra
            )));
        }

        Ok(fields)
    }

    /// Rebuild the typed value from field values
    fn from_fields(fields: &FieldMap) -> AuditResult<Self> {
        serde_json::from_value(fields.to_value()).map_err(|e| {
            AuditError::Json(format!(
                "Failed to materialize {}: {}",
                Self::schema().entity,
                e
            ))
        })
    }
}

/// Registry of the entity schemas a tracker is allowed to hold
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    by_entity: HashMap<&'static str, &'static EntitySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type, validating its schema
    pub fn register<E: Entity>(&mut self) -> AuditResult<&mut Self> {
        let schema = E::schema();
        schema.validate()?;

        if self
            .by_entity
            .values()
            .any(|s| s.table == schema.table && s.entity != schema.entity)
        {
            return Err(AuditError::Validation(format!(
                "Table '{}' is already mapped by another entity",
                schema.table
            )));
        }

        self.by_entity.insert(schema.entity, schema);
        Ok(self)
    }

    /// Look up a schema by entity name
    pub fn get(&self, entity: &str) -> Option<&'static EntitySchema> {
        self.by_entity.get(entity).copied()
    }

    /// Look up a schema by table name
    pub fn by_table(&self, table: &str) -> Option<&'static EntitySchema> {
        self.by_entity.values().find(|s| s.table == table).copied()
    }

    /// Schema for `E`, provided `E` was registered
    pub fn schema_of<E: Entity>(&self) -> AuditResult<&'static EntitySchema> {
        let entity = E::schema().entity;
        self.get(entity)
            .ok_or_else(|| AuditError::UnknownEntity(entity.to_string()))
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.by_entity.contains_key(entity)
    }

    /// Registered table names, sorted
    pub fn tables(&self) -> Vec<&'static str> {
        let mut tables: Vec<_> = self.by_entity.values().map(|s| s.table).collect();
        tables.sort_unstable();
        tables
    }

    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }
}
