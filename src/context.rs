//! Target resolution for doclatch.
//!
//! Every lock operation is keyed by a target directory. This module turns a
//! user-supplied target path into the absolute paths of its lock record and
//! its optional config file, so the same target always maps to the same
//! record regardless of how it was spelled on the command line.

use crate::config::types::{TARGET_CONFIG_FILE, TARGET_RECORD_FILE, TARGET_STATE_DIR};
use crate::config::{Config, LockLocation};
use crate::error::{LatchError, Result};
use std::path::{Path, PathBuf};

/// Resolved paths for one documentation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetContext {
    /// Absolute, normalized path of the target directory.
    pub target: PathBuf,

    /// Absolute path of the lock record for this target.
    pub record_path: PathBuf,
}

impl TargetContext {
    /// Resolve a target against the configured lock location.
    ///
    /// The target must be an existing directory.
    pub fn resolve<P: AsRef<Path>>(target: P, config: &Config) -> Result<Self> {
        let target = canonical_target(target.as_ref())?;
        let record_path = record_path_for(&target, config);
        Ok(Self {
            target,
            record_path,
        })
    }
}

/// Path of the per-target config file, before any config is loaded.
pub fn target_config_path(target: &Path) -> PathBuf {
    target.join(TARGET_STATE_DIR).join(TARGET_CONFIG_FILE)
}

fn canonical_target(target: &Path) -> Result<PathBuf> {
    let canonical = target.canonicalize().map_err(|e| {
        LatchError::UserError(format!(
            "failed to resolve target '{}': {}",
            target.display(),
            e
        ))
    })?;

    if !canonical.is_dir() {
        return Err(LatchError::UserError(format!(
            "target '{}' is not a directory",
            target.display()
        )));
    }

    Ok(canonical)
}

fn record_path_for(target: &Path, config: &Config) -> PathBuf {
    match config.lock_location {
        LockLocation::Target => target.join(TARGET_STATE_DIR).join(TARGET_RECORD_FILE),
        LockLocation::StateDir => config
            .state_dir
            .join("locks")
            .join(format!("{}.json", target_hash(target))),
    }
}

/// Normalize a path for hashing: strips trailing slashes except for root "/".
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// MD5 of the normalized target path, used as the state-dir record name.
pub fn target_hash(target: &Path) -> String {
    let normalized = normalize_path(&target.to_string_lossy());
    format!("{:x}", md5::compute(normalized))
}
