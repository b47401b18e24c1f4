//! YAML export
//!
//! Same structure as the JSON export, in a human-readable form.

use std::io::Write;

use crate::error::{AuditError, AuditResult};
use crate::export::json::AuditExport;

fn export_err(e: impl std::fmt::Display) -> AuditError {
    AuditError::Export(e.to_string())
}

/// Write an export as YAML, preceded by a comment header
pub fn export_yaml<W: Write>(export: &AuditExport, writer: &mut W) -> AuditResult<()> {
    writeln!(writer, "# audit-trail export").map_err(export_err)?;
    writeln!(writer, "# Generated: {}", export.exported_at).map_err(export_err)?;
    writeln!(writer, "# App Version: {}", export.app_version).map_err(export_err)?;
    writeln!(writer, "# Records: {}", export.record_count).map_err(export_err)?;
    writeln!(writer).map_err(export_err)?;

    serde_yaml::to_writer(writer, export).map_err(export_err)
}

/// Parse and validate a YAML export
pub fn import_from_yaml(yaml_str: &str) -> AuditResult<AuditExport> {
    let export: AuditExport = serde_yaml::from_str(yaml_str).map_err(export_err)?;
    export.validate().map_err(AuditError::Export)?;
    Ok(export)
}
