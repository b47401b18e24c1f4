//! Export CLI command

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::error::{AuditError, AuditResult};
use crate::export::{export_json, export_records_csv, export_yaml, AuditExport};
use crate::storage::AuditLog;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// CSV, one row per record
    Csv,
    /// JSON with export metadata
    Json,
    /// YAML with export metadata, human-readable
    Yaml,
}

/// Arguments of `export`
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file path
    pub output: PathBuf,

    /// Export format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ExportFormat,

    /// Only export records for this table
    #[arg(short, long)]
    pub table: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Handle the export command
pub fn handle_export_command(log: &AuditLog, args: ExportArgs) -> AuditResult<()> {
    let export = AuditExport::from_log(log, args.table.as_deref())?;

    let file = File::create(&args.output).map_err(|e| {
        AuditError::Export(format!(
            "Failed to create file {}: {}",
            args.output.display(),
            e
        ))
    })?;
    let mut writer = BufWriter::new(file);

    match args.format {
        ExportFormat::Csv => export_records_csv(&export.records, &mut writer)?,
        ExportFormat::Json => export_json(&export, &mut writer, args.pretty)?,
        ExportFormat::Yaml => export_yaml(&export, &mut writer)?,
    }
    writer
        .flush()
        .map_err(|e| AuditError::Export(format!("Failed to write {}: {}", args.output.display(), e)))?;

    println!(
        "Exported {} audit record(s) to: {}",
        export.record_count,
        args.output.display()
    );
    Ok(())
}
