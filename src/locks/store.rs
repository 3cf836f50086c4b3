//! Whole-record persistence for one target's lock file.

use super::record::LockRecord;
use crate::context::TargetContext;
use crate::error::{LatchError, Result};
use crate::fs::atomic_write_file;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads and writes the lock record of a single target.
///
/// There are no partial-field updates: every write replaces the whole
/// record. Merging is the caller's job.
#[derive(Debug, Clone)]
pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    /// Store backed by an explicit record path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for a resolved target.
    pub fn for_target(ctx: &TargetContext) -> Self {
        Self::new(ctx.record_path.clone())
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current record.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - No record on disk
    /// * `Ok(Some(record))` - A well-formed record
    /// * `Err(LatchError::CorruptRecord)` - The file exists but is malformed
    /// * `Err(LatchError::Persist)` - The file could not be read
    pub fn read(&self) -> Result<Option<LockRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LatchError::Persist(format!(
                    "failed to read lock record '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        LockRecord::from_json(&content).map(Some).map_err(|e| {
            LatchError::CorruptRecord(format!("'{}': {}", self.path.display(), e))
        })
    }

    /// Replace the record on disk atomically.
    pub fn write(&self, record: &LockRecord) -> Result<()> {
        let json = record
            .to_json()
            .map_err(|e| LatchError::Persist(format!("failed to serialize lock record: {}", e)))?;
        atomic_write_file(&self.path, &json)
    }

    /// Delete the record. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LatchError::Persist(format!(
                "failed to remove lock record '{}': {}",
                self.path.display(),
                e
            ))),
        }
    }
}
