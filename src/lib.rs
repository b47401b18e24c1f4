//! audit-trail - automatic audit capture for an entity store
//!
//! Every commit made through an [`AuditContext`] leaves one durable audit
//! record per inserted, updated or deleted entity: the table, the row key,
//! and the before/after values of the fields that changed. Values the store
//! only assigns during the commit (auto-increment keys, timestamps) are
//! captured after the commit and never recorded as placeholders.
//!
//! # Architecture
//!
//! - `models`: field maps, static entity schemas, the audit record
//! - `tracker`: the change tracker the audit core reads from
//! - `audit`: snapshot builder, post-commit resolver, audit writer
//! - `storage`: the `Backend` seam, a JSON file store and the audit log
//! - `context`: the commit cycle tying it all together
//! - `config`, `logging`, `error`: ambient setup
//! - `display`, `export`, `cli`: read-only inspection tooling
//!
//! # Example
//!
//! ```rust,ignore
//! use audit_trail::{AuditContext, JsonStore, SchemaRegistry, Settings};
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register::<Person>()?;
//!
//! let store = JsonStore::new(paths)?;
//! let mut ctx = AuditContext::new(registry, store, Settings::default());
//!
//! let id = ctx.add(&Person { id: 0, name: "Alice".into() })?;
//! let summary = ctx.save_changes().await?;
//! assert_eq!(summary.audited(), 1);
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod storage;
pub mod tracker;

pub use config::{AuditPaths, Settings};
pub use context::{AuditContext, SaveSummary};
pub use error::{AuditError, AuditResult};
pub use models::{AuditRecord, Entity, EntitySchema, FieldDescriptor, FieldMap, SchemaRegistry};
pub use storage::{Backend, JsonStore};
pub use tracker::{ChangeTracker, EntityState, EntryId, Tracker};
