use crate::config::Config;
use crate::context::TargetContext;
use crate::locks::{LockRecord, LockStore, ProcessProbe, RunStatus};
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Mutex;
use tempfile::TempDir;

/// Process table stand-in: only the listed PIDs are alive.
#[derive(Debug, Default)]
pub(crate) struct FakeProbe {
    alive: Mutex<HashSet<u32>>,
}

impl FakeProbe {
    pub(crate) fn with_alive(pids: &[u32]) -> Self {
        Self {
            alive: Mutex::new(pids.iter().copied().collect()),
        }
    }

    pub(crate) fn kill(&self, pid: u32) {
        self.alive.lock().unwrap().remove(&pid);
    }
}

impl ProcessProbe for FakeProbe {
    fn is_alive(&self, pid: u32) -> bool {
        self.alive.lock().unwrap().contains(&pid)
    }
}

/// Config suited to tests: fast heartbeat, no process exit on signals.
pub(crate) fn test_config() -> Config {
    Config {
        heartbeat_interval_secs: 1,
        stale_threshold_secs: 30,
        finalize_grace_ms: 500,
        exit_on_signal: false,
        ..Config::default()
    }
}

/// A fresh target directory plus its resolved context and store.
pub(crate) fn create_test_target(config: &Config) -> (TempDir, TargetContext, LockStore) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = TargetContext::resolve(temp_dir.path(), config).unwrap();
    let store = LockStore::for_target(&ctx);
    (temp_dir, ctx, store)
}

/// A local record with the given status, owner, and heartbeat age.
pub(crate) fn record_with(status: RunStatus, owner_id: u32, heartbeat_age_secs: i64) -> LockRecord {
    let mut record = LockRecord::new_running();
    record.status = status;
    record.owner_id = owner_id;
    record.started_at = Utc::now() - Duration::seconds(heartbeat_age_secs + 60);
    record.last_heartbeat_at = Utc::now() - Duration::seconds(heartbeat_age_secs);
    record
}

/// A PID that is not in use: spawn a short-lived child and reap it.
pub(crate) fn dead_pid() -> u32 {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}
