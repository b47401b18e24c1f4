//! Append-only audit store
//!
//! Records are kept as line-delimited JSON (JSONL), one complete record per
//! line. The store assigns each record its id on append.
//!
//! An append happens in two steps: [`AuditLog::prepare`] assigns ids,
//! serializes the lines and opens the file, then [`PendingAppend::write`]
//! writes and syncs them. A written append can still be cut off again with
//! [`PendingAppend::rollback`].

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::error::{AuditError, AuditResult};
use crate::models::AuditRecord;

/// Serialized lines of one append, not yet in the log
#[derive(Debug)]
pub struct PendingAppend {
    /// `None` when there is nothing to append
    file: Option<File>,
    start_len: u64,
    lines: Vec<u8>,
    ids: Vec<i64>,
}

impl PendingAppend {
    /// Ids the records will have once written
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Write and sync the lines; on failure the log is cut back first
    pub fn write(&mut self) -> AuditResult<Vec<i64>> {
        let Some(file) = self.file.as_mut() else {
            return Ok(Vec::new());
        };

        let written = file.write_all(&self.lines).and_then(|()| file.sync_all());
        if let Err(e) = written {
            self.rollback();
            return Err(AuditError::Io(format!("Failed to write audit log: {}", e)));
        }
        Ok(self.ids.clone())
    }

    /// Truncate the log back to its length before this append
    pub fn rollback(&mut self) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.set_len(self.start_len).and_then(|()| file.sync_all()) {
                warn!(error = %e, len = self.start_len, "failed to roll back audit log");
            }
        }
    }
}

/// Handles appending audit records to, and reading them from, the log file
#[derive(Debug, Clone)]
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append records, assigning ids after the highest id already stored
    ///
    /// All lines are written and synced before returning. Returns the
    /// assigned ids in input order.
    pub fn append(&self, records: &[AuditRecord]) -> AuditResult<Vec<i64>> {
        self.prepare(records)?.write()
    }

    /// Assign ids and serialize `records` without writing anything
    ///
    /// Opens (and creates) the log file only when `records` is non-empty.
    pub fn prepare(&self, records: &[AuditRecord]) -> AuditResult<PendingAppend> {
        if records.is_empty() {
            return Ok(PendingAppend {
                file: None,
                start_len: 0,
                lines: Vec::new(),
                ids: Vec::new(),
            });
        }

        let mut next_id = self.max_id()? + 1;
        let mut lines = Vec::new();
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let stored = AuditRecord {
                id: Some(next_id),
                ..record.clone()
            };
            serde_json::to_writer(&mut lines, &stored)
                .map_err(|e| AuditError::Json(format!("Failed to serialize audit record: {}", e)))?;
            lines.push(b'\n');

            ids.push(next_id);
            next_id += 1;
        }

        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuditError::Io(format!("Failed to create audit directory: {}", e)))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| AuditError::Io(format!("Failed to open audit log: {}", e)))?;
        let start_len = file
            .metadata()
            .map_err(|e| AuditError::Io(format!("Failed to stat audit log: {}", e)))?
            .len();

        Ok(PendingAppend {
            file: Some(file),
            start_len,
            lines,
            ids,
        })
    }

    /// Read all records, oldest first
    pub fn read_all(&self) -> AuditResult<Vec<AuditRecord>> {
        self.lines()?
            .into_iter()
            .map(|(line_num, line)| {
                serde_json::from_str(&line).map_err(|e| {
                    AuditError::Json(format!(
                        "Failed to parse audit record at line {}: {}",
                        line_num, e
                    ))
                })
            })
            .collect()
    }

    /// Read the most recent `count` records
    pub fn read_recent(&self, count: usize) -> AuditResult<Vec<AuditRecord>> {
        let all = self.read_all()?;
        let start = all.len().saturating_sub(count);
        Ok(all[start..].to_vec())
    }

    /// Find a record by its store-assigned id
    pub fn find(&self, id: i64) -> AuditResult<AuditRecord> {
        self.read_all()?
            .into_iter()
            .find(|record| record.id == Some(id))
            .ok_or_else(|| AuditError::record_not_found(id.to_string()))
    }

    /// Number of records in the log
    pub fn entry_count(&self) -> AuditResult<usize> {
        Ok(self.lines()?.len())
    }

    /// Check every line of the log, collecting a description of each problem
    ///
    /// Covers unparsable lines, key/old/new blobs that do not parse back to
    /// field maps, missing ids and duplicate ids.
    pub fn verify(&self) -> AuditResult<Vec<String>> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for (line_num, line) in self.lines()? {
            let record: AuditRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    problems.push(format!("line {}: {}", line_num, e));
                    continue;
                }
            };

            match record.id {
                Some(id) if !seen.insert(id) => {
                    problems.push(format!("line {}: duplicate id {}", line_num, id))
                }
                Some(_) => {}
                None => problems.push(format!("line {}: record has no id", line_num)),
            }

            if let Err(e) = record.verify() {
                problems.push(format!("line {}: {}", line_num, e));
            }
        }

        Ok(problems)
    }

    pub fn exists(&self) -> bool {
        self.log_path.exists()
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }

    /// Highest stored id; lines that do not parse are skipped (`verify` reports them)
    fn max_id(&self) -> AuditResult<i64> {
        #[derive(Deserialize)]
        struct StoredId {
            id: Option<i64>,
        }

        Ok(self
            .lines()?
            .iter()
            .filter_map(|(_, line)| serde_json::from_str::<StoredId>(line).ok())
            .filter_map(|stored| stored.id)
            .max()
            .unwrap_or(0))
    }

    /// Non-empty lines with their 1-based line numbers
    fn lines(&self) -> AuditResult<Vec<(usize, String)>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| AuditError::Io(format!("Failed to open audit log: {}", e)))?;

        let mut lines = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                AuditError::Io(format!("Failed to read audit log line {}: {}", index + 1, e))
            })?;
            if !line.trim().is_empty() {
                lines.push((index + 1, line));
            }
        }
        Ok(lines)
    }
}
