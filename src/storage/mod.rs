//! Storage layer for audit-trail
//!
//! The `Backend` seam the audit context commits through, plus a file-backed
//! engine: JSON table files with atomic writes and an append-only JSONL
//! audit log.

pub mod audit_log;
pub mod backend;
pub mod file_io;
pub mod json_store;
pub mod tables;

pub use audit_log::AuditLog;
pub use backend::{Backend, CommitBatch, CommitReceipt, GeneratedValue, Mutation, MutationKind};
pub use file_io::{read_json, write_json_atomic};
pub use json_store::JsonStore;
pub use tables::TableData;
