//! Core data models for audit-trail
//!
//! This module contains the schema types entities declare, the ordered
//! field map used for audit payloads, and the durable audit record.

pub mod field_map;
pub mod record;
pub mod schema;

pub use field_map::FieldMap;
pub use record::{AuditRecord, Operation};
pub use schema::{Entity, EntitySchema, FieldDescriptor, SchemaRegistry};
