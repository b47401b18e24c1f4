//! Audit log export
//!
//! - CSV: one row per record (spreadsheet-compatible)
//! - JSON: machine-readable export with schema version and metadata
//! - YAML: the same export in a human-readable form

pub mod csv;
pub mod json;
pub mod yaml;

pub use self::csv::export_records_csv;
pub use json::{export_json, import_from_json, AuditExport, EXPORT_SCHEMA_VERSION};
pub use yaml::{export_yaml, import_from_yaml};
