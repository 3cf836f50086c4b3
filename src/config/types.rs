//! Configuration types and defaults for doclatch.
//!
//! This module defines enums, constants, and default value functions
//! used by the Config struct.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the lock record for a target is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockLocation {
    /// Inside the target: `<target>/.doclatch/session.json` (default).
    #[default]
    Target,
    /// In the state directory, keyed by a hash of the target path:
    /// `<state_dir>/locks/<md5>.json`.
    StateDir,
}

/// Name of the per-target directory holding the record and optional config.
pub const TARGET_STATE_DIR: &str = ".doclatch";

/// File name of the record when stored inside the target.
pub const TARGET_RECORD_FILE: &str = "session.json";

/// File name of the optional per-target config.
pub const TARGET_CONFIG_FILE: &str = "config.yaml";

pub(crate) fn default_heartbeat_interval_secs() -> u64 {
    5
}

pub(crate) fn default_stale_threshold_secs() -> u64 {
    30
}

pub(crate) fn default_finalize_retries() -> u32 {
    3
}

pub(crate) fn default_finalize_grace_ms() -> u64 {
    2000
}

pub(crate) fn default_true() -> bool {
    true
}

/// `~/.doclatch`, falling back to `./.doclatch` when there is no home directory.
pub(crate) fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(TARGET_STATE_DIR))
        .unwrap_or_else(|| PathBuf::from(TARGET_STATE_DIR))
}
