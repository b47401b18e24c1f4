//! Audit log CLI commands
//!
//! Read-only inspection of the audit store.

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_record_details, format_record_list};
use crate::error::{AuditError, AuditResult};
use crate::storage::AuditLog;

/// Log subcommands
#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// List the most recent audit records
    List {
        /// Only show records for this table
        #[arg(short, long)]
        table: Option<String>,
        /// Number of records to show (defaults to the configured limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show one audit record with its change summary
    Show {
        /// Audit record ID
        id: i64,
    },
    /// Check that every stored record is readable
    Verify,
}

/// Handle a log command
pub fn handle_log_command(log: &AuditLog, settings: &Settings, cmd: LogCommands) -> AuditResult<()> {
    match cmd {
        LogCommands::List { table, limit } => {
            let limit = limit.unwrap_or(settings.list_limit);
            let mut records = log.read_all()?;
            if let Some(table) = &table {
                records.retain(|r| &r.table == table);
            }
            let start = records.len().saturating_sub(limit);

            print!("{}", format_record_list(&records[start..], &settings.date_format));
            if records.is_empty() {
                println!();
            }
        }

        LogCommands::Show { id } => {
            let record = log.find(id)?;
            print!("{}", format_record_details(&record, &settings.date_format));
        }

        LogCommands::Verify => {
            let count = log.entry_count()?;
            let problems = log.verify()?;

            if problems.is_empty() {
                println!("Audit log OK: {} record(s) verified", count);
                return Ok(());
            }

            for problem in &problems {
                println!("  {}", problem);
            }
            return Err(AuditError::Validation(format!(
                "{} problem(s) found in {}",
                problems.len(),
                log.path().display()
            )));
        }
    }

    Ok(())
}
