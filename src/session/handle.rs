//! The narrow reporting API handed to an operation.

use super::state::SessionState;
use crate::locks::LockRecord;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Progress reporting for a running operation.
///
/// Every method only touches the in-memory record. Changes reach disk on the
/// next heartbeat tick or at finalize, whichever comes first. After the
/// session is finalized, updates are ignored.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<SessionState>,
}

impl SessionHandle {
    pub(crate) fn new(state: Arc<SessionState>) -> Self {
        Self { state }
    }

    /// Set the short label of the work in progress.
    pub fn update_phase(&self, phase: impl Into<String>) {
        let phase = phase.into();
        self.state.update(|record| record.current_phase = phase);
    }

    /// Set progress, clamped to 100. Values below the current progress are
    /// ignored so progress never moves backwards within a run.
    pub fn update_progress(&self, percent: u8) {
        let percent = percent.min(100);
        self.state.update(|record| {
            if percent > record.progress_percent {
                record.progress_percent = percent;
            }
        });
    }

    /// Append a finished task. Repeated ids are recorded once.
    pub fn mark_task_complete(&self, task_id: impl Into<String>) {
        let task_id = task_id.into();
        self.state.update(|record| {
            if !record.completed_tasks.contains(&task_id) {
                record.completed_tasks.push(task_id);
            }
        });
    }

    /// Replace the resume checkpoint.
    pub fn set_checkpoint(&self, checkpoint: Value) {
        self.state.update(|record| record.checkpoint = Some(checkpoint));
    }

    /// True once a signal or process exit has ended the run. The record is
    /// already final and further updates are dropped, so the operation should
    /// stop and return.
    pub fn is_interrupted(&self) -> bool {
        self.state.is_finalized()
    }

    /// The current in-memory record.
    pub fn snapshot(&self) -> LockRecord {
        self.state.snapshot()
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> &str {
        self.state.run_id()
    }

    /// Where the record is persisted.
    pub fn record_path(&self) -> &Path {
        self.state.store().path()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("run_id", &self.run_id())
            .field("record_path", &self.record_path())
            .finish()
    }
}
