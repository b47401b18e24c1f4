//! File I/O utilities with atomic writes
//!
//! A table file is either fully replaced or left untouched; readers never
//! observe a half-written table.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AuditError, AuditResult};

/// Read JSON from a file, returning the default value if it doesn't exist
pub fn read_json<T, P>(path: P) -> AuditResult<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| AuditError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AuditError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to a sibling temp file, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> AuditResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    stage_json(path, data)?.commit()
}

/// Write JSON to a synced sibling temp file, leaving `path` untouched
pub fn stage_json<T, P>(path: P, data: &T) -> AuditResult<StagedFile>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AuditError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory, so the rename stays on one filesystem
    let staged = StagedFile {
        temp: path.with_extension("json.tmp"),
        target: path.to_path_buf(),
    };

    let file = File::create(&staged.temp)
        .map_err(|e| AuditError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    let written = serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| AuditError::Storage(format!("Failed to serialize {}: {}", path.display(), e)))
        .and_then(|()| {
            writer
                .flush()
                .map_err(|e| AuditError::Storage(format!("Failed to flush data: {}", e)))
        })
        .and_then(|()| {
            writer
                .get_ref()
                .sync_all()
                .map_err(|e| AuditError::Storage(format!("Failed to sync data: {}", e)))
        });

    if let Err(e) = written {
        staged.discard();
        return Err(e);
    }
    Ok(staged)
}

/// A fully written temp file waiting to replace its target
#[derive(Debug)]
pub struct StagedFile {
    temp: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temp file over the target
    pub fn commit(&self) -> AuditResult<()> {
        fs::rename(&self.temp, &self.target).map_err(|e| {
            self.discard();
            AuditError::Storage(format!("Failed to replace {}: {}", self.target.display(), e))
        })
    }

    /// Remove the temp file, leaving the target as it was
    pub fn discard(&self) {
        let _ = fs::remove_file(&self.temp);
    }
}
