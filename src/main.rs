use anyhow::Result;
use clap::{Parser, Subcommand};

use audit_trail::cli::{handle_export_command, handle_log_command, ExportArgs, LogCommands};
use audit_trail::config::{AuditPaths, Settings};
use audit_trail::logging::{self, Profile};
use audit_trail::storage::AuditLog;

#[derive(Parser)]
#[command(
    name = "audit-trail",
    version,
    about = "Inspect the automatic audit trail of committed changes",
    long_about = "audit-trail records one audit entry for every entity inserted, \
                  updated or deleted by a commit. This tool lists, shows, verifies \
                  and exports the recorded history."
)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directories and default settings
    Init,

    /// Show current configuration and paths
    Config,

    /// Inspect audit records
    #[command(subcommand)]
    Log(LogCommands),

    /// Export audit records to a file
    Export(ExportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(if cli.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let paths = AuditPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    let log = AuditLog::new(paths.audit_log());

    match cli.command {
        Some(Commands::Init) => {
            paths.ensure_directories()?;
            settings.save(&paths)?;
            println!("Initialized audit-trail at: {}", paths.base_dir().display());
            println!("  Settings:  {}", paths.settings_file().display());
            println!("  Audit log: {}", paths.audit_log().display());
        }
        Some(Commands::Config) => {
            println!("audit-trail Configuration");
            println!("=========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Tables directory: {}", paths.tables_dir().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!("Exports:          {}", paths.exports_dir().display());
            println!();
            println!("Settings:");
            println!("  Schema version:  {}", settings.schema_version);
            if settings.excluded_tables.is_empty() {
                println!("  Excluded tables: (none)");
            } else {
                println!("  Excluded tables: {}", settings.excluded_tables.join(", "));
            }
            println!("  Date format:     {}", settings.date_format);
            println!("  List limit:      {}", settings.list_limit);
            println!("  Records stored:  {}", log.entry_count()?);
        }
        Some(Commands::Log(cmd)) => handle_log_command(&log, &settings, cmd)?,
        Some(Commands::Export(args)) => handle_export_command(&log, args)?,
        None => {
            println!("audit-trail - automatic audit capture for committed changes");
            println!();
            println!("Run 'audit-trail --help' for usage information.");
        }
    }

    Ok(())
}
