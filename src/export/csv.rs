//! CSV export
//!
//! One row per audit record, spreadsheet-compatible. The key, old and new
//! values are kept as their stored JSON text.

use std::io::Write;

use crate::error::{AuditError, AuditResult};
use crate::models::AuditRecord;

const HEADER: [&str; 7] = [
    "ID",
    "Timestamp",
    "Operation",
    "Table",
    "Key Values",
    "Old Values",
    "New Values",
];

/// Export records to CSV
pub fn export_records_csv<W: Write>(records: &[AuditRecord], writer: W) -> AuditResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    let export_err = |e: csv::Error| AuditError::Export(e.to_string());

    out.write_record(HEADER).map_err(export_err)?;

    for record in records {
        let id = record.id.map(|id| id.to_string()).unwrap_or_default();
        let operation = record
            .operation()
            .map(|op| op.to_string())
            .unwrap_or_default();
        let timestamp = record.timestamp.to_rfc3339();

        out.write_record([
            id.as_str(),
            timestamp.as_str(),
            operation.as_str(),
            record.table.as_str(),
            record.key_values.as_str(),
            record.old_values.as_deref().unwrap_or(""),
            record.new_values.as_deref().unwrap_or(""),
        ])
        .map_err(export_err)?;
    }

    out.flush()
        .map_err(|e| AuditError::Export(format!("Failed to flush CSV output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_csv_export_quotes_json() {
        let records = vec![AuditRecord {
            id: Some(7),
            table: "People".into(),
            timestamp: Utc::now(),
            key_values: r#"{"id":5}"#.into(),
            old_values: Some(r#"{"Name":"Alice","Age":30}"#.into()),
            new_values: Some(r#"{"Name":"Bob","Age":30}"#.into()),
        }];

        let mut buffer = Vec::new();
        export_records_csv(&records, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        let mut lines = output.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ID,Timestamp,Operation,Table,Key Values,Old Values,New Values"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("7,"));
        assert!(row.contains("UPDATE,People"));
        assert!(row.contains(r#""{""Name"":""Alice"",""Age"":30}""#));
    }

    #[test]
    fn test_csv_reads_back() {
        let records = vec![AuditRecord {
            id: Some(1),
            table: "People".into(),
            timestamp: Utc::now(),
            key_values: r#"{"id":1}"#.into(),
            old_values: None,
            new_values: Some(r#"{"Name":"Alice, Jr."}"#.into()),
        }];

        let mut buffer = Vec::new();
        export_records_csv(&records, &mut buffer).unwrap();

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[2], "INSERT");
        assert_eq!(&row[5], "");
        assert_eq!(&row[6], r#"{"Name":"Alice, Jr."}"#);
    }
}
