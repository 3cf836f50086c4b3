//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for session coordination.
///
/// Loaded from YAML. Unknown fields are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Liveness settings
    // =========================================================================
    /// Seconds between heartbeat writes while a run is active.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Seconds after which a `running` record without a heartbeat is no
    /// longer trusted. Must be at least three heartbeat intervals.
    #[serde(default = "default_stale_threshold_secs")]
    pub stale_threshold_secs: u64,

    // =========================================================================
    // Storage settings
    // =========================================================================
    /// Where lock records are stored.
    #[serde(default)]
    pub lock_location: LockLocation,

    /// State directory used when `lock_location` is `state_dir`.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Delete the record after a successful run instead of keeping it as an
    /// audit trail.
    #[serde(default)]
    pub remove_on_complete: bool,

    // =========================================================================
    // Termination settings
    // =========================================================================
    /// Attempts made to persist the final record before giving up.
    #[serde(default = "default_finalize_retries")]
    pub finalize_retries: u32,

    /// Total time budget, in milliseconds, for the final write.
    #[serde(default = "default_finalize_grace_ms")]
    pub finalize_grace_ms: u64,

    /// Exit the process after recording a termination signal.
    #[serde(default = "default_true")]
    pub exit_on_signal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            stale_threshold_secs: default_stale_threshold_secs(),
            lock_location: LockLocation::default(),
            state_dir: default_state_dir(),
            remove_on_complete: false,
            finalize_retries: default_finalize_retries(),
            finalize_grace_ms: default_finalize_grace_ms(),
            exit_on_signal: default_true(),
        }
    }
}
