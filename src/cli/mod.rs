//! CLI command handlers
//!
//! Bridges clap argument parsing with the audit store. Every command is
//! read-only over recorded history.

pub mod export;
pub mod log;

pub use export::{handle_export_command, ExportArgs, ExportFormat};
pub use log::{handle_log_command, LogCommands};
