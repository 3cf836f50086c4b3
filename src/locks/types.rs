//! Lock status reporting structures.

use super::liveness::Liveness;
use super::record::LockRecord;
use std::path::PathBuf;

/// Snapshot of a target's lock, as shown by `doclatch status`.
#[derive(Debug, Clone)]
pub struct LockStatus {
    /// The record file path.
    pub path: PathBuf,

    /// The record, if one exists and parses.
    pub record: Option<LockRecord>,

    /// How a new acquisition would treat the record.
    pub liveness: Liveness,

    /// Parse error, when the file exists but is corrupt.
    pub corrupt: Option<String>,
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.record, &self.corrupt) {
            (Some(record), _) => write!(
                f,
                "{} ({}: {})",
                self.path.display(),
                self.liveness,
                record
            ),
            (None, Some(reason)) => write!(f, "{} (corrupt: {})", self.path.display(), reason),
            (None, None) => write!(f, "{} (no record)", self.path.display()),
        }
    }
}
