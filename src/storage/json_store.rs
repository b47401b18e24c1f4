//! File-backed storage engine
//!
//! Each table lives in its own JSON file under `data/tables/`; audit
//! records go to the JSONL audit log. A commit runs in stages:
//!
//! 1. Apply every mutation in memory.
//! 2. Prepare the audit append and stage every table as a temp file.
//! 3. Write the audit lines, then rename the staged tables into place.
//!
//! A failure in stage 1 or 2 leaves every file untouched. A failure in
//! stage 3 truncates the audit log and restores the tables already
//! replaced. File I/O runs on the calling task with no await after the
//! write lock is taken, so dropping the future never leaves a commit half
//! done.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::audit_log::AuditLog;
use super::backend::{Backend, CommitBatch, CommitReceipt};
use super::file_io::{read_json, stage_json, write_json_atomic, StagedFile};
use super::tables::TableData;
use crate::config::AuditPaths;
use crate::error::{AuditError, AuditResult};
use crate::models::AuditRecord;

/// Storage engine over JSON table files and the audit log
#[derive(Debug, Clone)]
pub struct JsonStore {
    paths: AuditPaths,
    audit_log: AuditLog,
    /// Serializes commits and flushes against each other
    write_lock: Arc<Mutex<()>>,
}

impl JsonStore {
    /// Create a store rooted at `paths`, creating its directories
    pub fn new(paths: AuditPaths) -> AuditResult<Self> {
        paths.ensure_directories()?;
        Ok(Self {
            audit_log: AuditLog::new(paths.audit_log()),
            paths,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn paths(&self) -> &AuditPaths {
        &self.paths
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    /// Current contents of a table (empty if it was never written)
    pub fn read_table(&self, table: &str) -> AuditResult<TableData> {
        read_json(self.paths.table_file(table))
    }

    fn apply_batch(&self, batch: CommitBatch) -> AuditResult<CommitReceipt> {
        let committed_at = Utc::now().to_rfc3339();
        let mut tables: BTreeMap<String, TableData> = BTreeMap::new();
        // `None` for tables with no file yet
        let mut originals: BTreeMap<String, Option<TableData>> = BTreeMap::new();
        let mut receipt = CommitReceipt::default();

        for mutation in &batch.mutations {
            let table = match tables.entry(mutation.table.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let path = self.paths.table_file(&mutation.table);
                    let original: Option<TableData> =
                        if path.exists() { Some(read_json(&path)?) } else { None };
                    originals.insert(mutation.table.clone(), original.clone());
                    entry.insert(original.unwrap_or_default())
                }
            };

            let generated = table.apply(mutation, &committed_at)?;
            receipt.generated.extend(generated);
            receipt.rows_affected += 1;
        }

        let mut audit = self.audit_log.prepare(&batch.audit)?;

        let mut staged: Vec<(&str, StagedFile)> = Vec::with_capacity(tables.len());
        for (name, data) in &tables {
            match stage_json(self.paths.table_file(name), data) {
                Ok(file) => staged.push((name.as_str(), file)),
                Err(e) => {
                    staged.iter().for_each(|(_, file)| file.discard());
                    return Err(e);
                }
            }
        }

        receipt.audit_ids = match audit.write() {
            Ok(ids) => ids,
            Err(e) => {
                staged.iter().for_each(|(_, file)| file.discard());
                return Err(e);
            }
        };

        for (index, (_, file)) in staged.iter().enumerate() {
            if let Err(e) = file.commit() {
                audit.rollback();
                staged[index + 1..].iter().for_each(|(_, file)| file.discard());
                for (name, _) in &staged[..index] {
                    self.restore_table(name, originals.get(*name).and_then(Option::as_ref));
                }
                return Err(e);
            }
        }

        debug!(
            tables = tables.len(),
            rows = receipt.rows_affected,
            audit_records = receipt.audit_ids.len(),
            "applied commit to table files"
        );
        Ok(receipt)
    }

    fn restore_table(&self, name: &str, original: Option<&TableData>) {
        let path = self.paths.table_file(name);
        let restored = match original {
            Some(data) => write_json_atomic(&path, data),
            None => fs::remove_file(&path).map_err(AuditError::from),
        };
        if let Err(e) = restored {
            warn!(table = name, error = %e, "failed to restore table after a failed commit");
        }
    }
}

#[async_trait]
impl Backend for JsonStore {
    async fn commit(&self, batch: CommitBatch) -> AuditResult<CommitReceipt> {
        let _guard = self.write_lock.lock().await;
        self.apply_batch(batch)
    }

    async fn append_audit(&self, records: Vec<AuditRecord>) -> AuditResult<Vec<i64>> {
        let _guard = self.write_lock.lock().await;
        self.audit_log.append(&records)
    }
}
