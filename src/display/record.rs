//! Audit record display formatting
//!
//! Formats audit records for terminal output in table and detail views.

use crate::audit::describe_changes;
use crate::models::AuditRecord;

fn operation_label(record: &AuditRecord) -> String {
    record
        .operation()
        .map(|op| op.to_string())
        .unwrap_or_else(|| "KEYS".to_string())
}

fn id_label(record: &AuditRecord) -> String {
    record
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format a list of audit records as a table
///
/// `date_format` is a strftime pattern applied to each timestamp.
pub fn format_record_list(records: &[AuditRecord], date_format: &str) -> String {
    if records.is_empty() {
        return "No audit records found.".to_string();
    }

    let table_width = records
        .iter()
        .map(|r| r.table.len())
        .max()
        .unwrap_or(5)
        .max(5);

    let mut output = String::new();
    output.push_str(&format!(
        "{:>6}  {:<19}  {:<6}  {:<table_width$}  {}\n",
        "ID",
        "Timestamp",
        "Op",
        "Table",
        "Key",
        table_width = table_width,
    ));
    output.push_str(&format!(
        "{:->6}  {:-<19}  {:-<6}  {:-<table_width$}  {:-<10}\n",
        "",
        "",
        "",
        "",
        "",
        table_width = table_width,
    ));

    for record in records {
        output.push_str(&format!(
            "{:>6}  {:<19}  {:<6}  {:<table_width$}  {}\n",
            id_label(record),
            record.timestamp.format(date_format).to_string(),
            operation_label(record),
            record.table,
            record.key_values,
            table_width = table_width,
        ));
    }

    output.push_str(&format!("\n{} record(s)\n", records.len()));
    output
}

/// Format a single record with its parsed values and change summary
pub fn format_record_details(record: &AuditRecord, date_format: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Audit record {}\n", id_label(record)));
    output.push_str(&format!("  Table:      {}\n", record.table));
    output.push_str(&format!("  Operation:  {}\n", operation_label(record)));
    output.push_str(&format!(
        "  Timestamp:  {}\n",
        record.timestamp.format(date_format)
    ));
    output.push_str(&format!("  Key:        {}\n", record.key_values));

    if let Some(old) = &record.old_values {
        output.push_str(&format!("  Old values: {}\n", old));
    }
    if let Some(new) = &record.new_values {
        output.push_str(&format!("  New values: {}\n", new));
    }

    match (record.old_map(), record.new_map()) {
        (Ok(old), Ok(new)) => {
            let changes = describe_changes(old.as_ref(), new.as_ref());
            if !changes.is_empty() {
                output.push_str("\n  Changes:\n");
                for change in changes {
                    output.push_str(&format!("    {}\n", change));
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            output.push_str(&format!("\n  Unreadable values: {}\n", e));
        }
    }

    output
}
