//! JSON export
//!
//! Exports the audit log to JSON with schema versioning.

use std::collections::{BTreeSet, HashSet};
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::models::AuditRecord;
use crate::storage::AuditLog;

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Full audit log export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    pub record_count: usize,

    /// Distinct source tables, sorted
    pub tables: Vec<String>,

    pub records: Vec<AuditRecord>,
}

impl AuditExport {
    pub fn from_records(records: Vec<AuditRecord>) -> Self {
        let tables: BTreeSet<_> = records.iter().map(|r| r.table.clone()).collect();

        Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            record_count: records.len(),
            tables: tables.into_iter().collect(),
            records,
        }
    }

    /// Export every record in the log, optionally limited to one table
    pub fn from_log(log: &AuditLog, table: Option<&str>) -> AuditResult<Self> {
        let records = log
            .read_all()?
            .into_iter()
            .filter(|r| table.map_or(true, |t| r.table == t))
            .collect();
        Ok(Self::from_records(records))
    }

    /// Check the schema version, the record count, id uniqueness and that
    /// every stored blob parses
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        if self.record_count != self.records.len() {
            return Err(format!(
                "Record count mismatch: header says {}, found {}",
                self.record_count,
                self.records.len()
            ));
        }

        let mut ids = HashSet::new();
        for record in &self.records {
            if let Some(id) = record.id {
                if !ids.insert(id) {
                    return Err(format!("Duplicate audit record id {}", id));
                }
            }
            record
                .verify()
                .map_err(|e| format!("Record in table {} is unreadable: {}", record.table, e))?;
        }

        Ok(())
    }
}

/// Write an export as JSON
pub fn export_json<W: Write>(export: &AuditExport, writer: &mut W, pretty: bool) -> AuditResult<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, export)
    } else {
        serde_json::to_writer(writer, export)
    }
    .map_err(|e| AuditError::Export(e.to_string()))
}

/// Parse and validate a JSON export
pub fn import_from_json(json_str: &str) -> AuditResult<AuditExport> {
    let export: AuditExport =
        serde_json::from_str(json_str).map_err(|e| AuditError::Export(e.to_string()))?;
    export.validate().map_err(AuditError::Export)?;
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(table: &str, new: &str) -> AuditRecord {
        AuditRecord {
            id: None,
            table: table.into(),
            timestamp: Utc::now(),
            key_values: r#"{"id":1}"#.into(),
            old_values: None,
            new_values: Some(new.into()),
        }
    }

    fn populated_log() -> (AuditLog, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let log = AuditLog::new(temp_dir.path().join("audit.jsonl"));
        log.append(&[
            record("People", r#"{"Name":"Alice"}"#),
            record("Orders", r#"{"Total":12}"#),
            record("People", r#"{"Name":"Bob"}"#),
        ])
        .unwrap();
        (log, temp_dir)
    }

    #[test]
    fn test_export_from_log() {
        let (log, _temp) = populated_log();

        let export = AuditExport::from_log(&log, None).unwrap();

        assert_eq!(export.schema_version, EXPORT_SCHEMA_VERSION);
        assert_eq!(export.record_count, 3);
        assert_eq!(export.tables, vec!["Orders".to_string(), "People".to_string()]);
        assert!(export.validate().is_ok());
    }

    #[test]
    fn test_export_filtered_by_table() {
        let (log, _temp) = populated_log();

        let export = AuditExport::from_log(&log, Some("People")).unwrap();
        assert_eq!(export.record_count, 2);
        assert!(export.records.iter().all(|r| r.table == "People"));
    }

    #[test]
    fn test_json_round_trip() {
        let (log, _temp) = populated_log();
        let export = AuditExport::from_log(&log, None).unwrap();

        let mut buffer = Vec::new();
        export_json(&export, &mut buffer, true).unwrap();

        let imported = import_from_json(&String::from_utf8(buffer).unwrap()).unwrap();
        assert_eq!(imported.records, export.records);
    }

    #[test]
    fn test_validate_rejects_tampered_count() {
        let mut export = AuditExport::from_records(vec![record("People", "{}")]);
        export.record_count = 5;
        assert!(export.validate().unwrap_err().contains("Record count mismatch"));
    }

    #[test]
    fn test_validate_rejects_unreadable_blob() {
        let export = AuditExport::from_records(vec![record("People", "[1,2]")]);
        assert!(export.validate().is_err());
    }
}
