//! The persisted lock record and its status enum.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of the run a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// A process claims to be working on the target right now.
    Running,
    /// The run was stopped by a signal or process exit before finishing.
    Interrupted,
    /// The operation returned an error or panicked.
    Failed,
    /// The operation finished successfully.
    Completed,
}

impl RunStatus {
    /// Whether this status ends a run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    /// Whether a later run may pick up this record's checkpoint.
    pub fn is_resumable(self) -> bool {
        matches!(self, RunStatus::Interrupted | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Interrupted => write!(f, "interrupted"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Completed => write!(f, "completed"),
        }
    }
}

/// The single persisted record describing the current or last run for a target.
///
/// Every write replaces the whole record; merging happens in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Process ID of the holder, used for liveness probing.
    pub owner_id: u32,

    /// Host the holder runs on.
    pub hostname: String,

    /// Unique identifier of the run that wrote this record.
    pub run_id: String,

    /// When the run started (RFC3339).
    pub started_at: DateTime<Utc>,

    /// When the holder last proved it was alive (RFC3339).
    pub last_heartbeat_at: DateTime<Utc>,

    pub status: RunStatus,

    /// Short label of the work in progress.
    #[serde(default)]
    pub current_phase: String,

    /// 0-100, monotonic within one run.
    #[serde(default)]
    pub progress_percent: u8,

    /// Task identifiers finished so far, in completion order.
    #[serde(default)]
    pub completed_tasks: Vec<String>,

    /// Operation-defined payload used to resume mid-run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Value>,

    /// Present only for `failed` and `interrupted` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LockRecord {
    /// Create a fresh `running` record owned by the current process.
    pub fn new_running() -> Self {
        let now = Utc::now();
        Self {
            owner_id: std::process::id(),
            hostname: local_hostname(),
            run_id: ulid::Ulid::new().to_string(),
            started_at: now,
            last_heartbeat_at: now,
            status: RunStatus::Running,
            current_phase: String::new(),
            progress_percent: 0,
            completed_tasks: Vec::new(),
            checkpoint: None,
            error: None,
        }
    }

    /// Parse a record from its JSON encoding.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Serialize the record to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Whether the record was written by a process on this machine.
    pub fn is_local(&self) -> bool {
        self.hostname == local_hostname()
    }

    /// Time elapsed since the last heartbeat, measured against `now`.
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_heartbeat_at)
    }

    /// Time elapsed since the run started.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.started_at)
    }

    /// Format the run age as a human-readable string.
    pub fn age_string(&self) -> String {
        format_duration(self.age())
    }

    /// Format the heartbeat age as a human-readable string.
    pub fn heartbeat_age_string(&self) -> String {
        format_duration(self.heartbeat_age(Utc::now()))
    }
}

impl std::fmt::Display for LockRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pid {} on {}, {}, phase '{}', {}% done, last heartbeat {} ago",
            self.owner_id,
            self.hostname,
            self.status,
            self.current_phase,
            self.progress_percent,
            self.heartbeat_age_string()
        )
    }
}

fn format_duration(age: Duration) -> String {
    let seconds = age.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Hostname of this machine, or "unknown" when it cannot be determined.
pub fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
