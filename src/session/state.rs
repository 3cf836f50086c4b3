//! In-memory state shared by the handle, heartbeat, and termination hooks.
//!
//! All writes for one session go through the `io` mutex. The heartbeat checks
//! `finalized` while holding it, so once the final record is written no tick
//! can overwrite it.

use super::termination::Termination;
use crate::error::{LatchError, Result};
use crate::locks::{LockRecord, LockStore, RunStatus};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const FINALIZE_POLL: Duration = Duration::from_millis(10);

/// Result of one heartbeat attempt.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tick {
    /// The record was refreshed on disk.
    Written,
    /// The session already wrote its final record.
    Finalized,
    /// The record on disk belongs to another run, was already finalized, or
    /// was removed; stop ticking.
    Superseded(Option<Box<LockRecord>>),
}

pub(crate) struct SessionState {
    store: LockStore,
    run_id: String,
    record: Mutex<LockRecord>,
    io: Mutex<()>,
    finalized: AtomicBool,
    finalize_retries: u32,
    finalize_grace: Duration,
}

pub(crate) fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

impl SessionState {
    pub(crate) fn new(
        store: LockStore,
        record: LockRecord,
        finalize_retries: u32,
        finalize_grace: Duration,
    ) -> Self {
        Self {
            store,
            run_id: record.run_id.clone(),
            record: Mutex::new(record),
            io: Mutex::new(()),
            finalized: AtomicBool::new(false),
            finalize_retries: finalize_retries.max(1),
            finalize_grace,
        }
    }

    pub(crate) fn store(&self) -> &LockStore {
        &self.store
    }

    pub(crate) fn run_id(&self) -> &str {
        &self.run_id
    }

    pub(crate) fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> LockRecord {
        lock_recovering(&self.record).clone()
    }

    /// Apply an in-memory change. Ignored once the session is finalized.
    pub(crate) fn update(&self, apply: impl FnOnce(&mut LockRecord)) {
        let mut record = lock_recovering(&self.record);
        if self.is_finalized() {
            return;
        }
        apply(&mut record);
    }

    /// Refresh `last_heartbeat_at` and flush buffered updates.
    pub(crate) fn heartbeat(&self) -> Result<Tick> {
        let _io = lock_recovering(&self.io);
        if self.is_finalized() {
            return Ok(Tick::Finalized);
        }

        match self.store.read() {
            Ok(Some(on_disk)) if on_disk.run_id != self.run_id || on_disk.status.is_terminal() => {
                return Ok(Tick::Superseded(Some(Box::new(on_disk))));
            }
            Ok(None) => return Ok(Tick::Superseded(None)),
            Ok(Some(_)) => {}
            Err(LatchError::CorruptRecord(reason)) => {
                warn!(%reason, "own lock record is corrupt; rewriting it");
            }
            Err(e) => return Err(e),
        }

        let record = {
            let mut record = lock_recovering(&self.record);
            record.last_heartbeat_at = Utc::now();
            record.clone()
        };
        self.store.write(&record)?;
        Ok(Tick::Written)
    }

    /// Write the final record exactly once.
    ///
    /// Returns `Ok(false)` when another path already finalized the session.
    pub(crate) fn finalize(&self, status: RunStatus, error: Option<String>) -> Result<bool> {
        if self
            .finalized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }

        let record = {
            let mut record = lock_recovering(&self.record);
            record.status = status;
            record.last_heartbeat_at = Utc::now();
            if status == RunStatus::Completed {
                record.progress_percent = 100;
                record.error = None;
            } else {
                record.error = error;
            }
            record.clone()
        };

        self.persist_final(&record)?;
        info!(
            run_id = %self.run_id,
            status = %record.status,
            phase = %record.current_phase,
            progress = record.progress_percent,
            "session finalized"
        );
        Ok(true)
    }

    /// Finalize in response to a signal, panic, or process exit.
    pub(crate) fn terminate(&self, termination: &Termination) {
        match self.finalize(termination.status(), Some(termination.message())) {
            Ok(true) => warn!(run_id = %self.run_id, cause = %termination, "run terminated"),
            Ok(false) => debug!(run_id = %self.run_id, cause = %termination, "already finalized"),
            Err(e) => warn!(
                run_id = %self.run_id,
                cause = %termination,
                error = %e,
                "failed to record termination"
            ),
        }
    }

    /// Delete the record after a successful run.
    pub(crate) fn remove_record(&self) -> Result<bool> {
        let _io = lock_recovering(&self.io);
        self.store.remove()
    }

    /// Synchronous write bounded by the grace period.
    ///
    /// `try_lock` keeps a hook that fires on a thread already holding `io`
    /// (a panic mid-write) from deadlocking; it gives up at the deadline.
    fn persist_final(&self, record: &LockRecord) -> Result<()> {
        let deadline = Instant::now() + self.finalize_grace;
        let retry_pause = self.finalize_grace / self.finalize_retries;
        let mut failures = 0;

        loop {
            let attempt = match self.io.try_lock() {
                Ok(_io) => self.store.write(record),
                Err(TryLockError::Poisoned(_io)) => self.store.write(record),
                Err(TryLockError::WouldBlock) if Instant::now() < deadline => {
                    thread::sleep(FINALIZE_POLL);
                    continue;
                }
                Err(TryLockError::WouldBlock) => {
                    return Err(LatchError::Persist(format!(
                        "timed out waiting to write final record '{}'",
                        self.store.path().display()
                    )));
                }
            };

            let Err(e) = attempt else { return Ok(()) };
            failures += 1;
            if failures >= self.finalize_retries || Instant::now() >= deadline {
                return Err(e);
            }
            warn!(attempt = failures, error = %e, "final write failed, retrying");
            thread::sleep(retry_pause.min(deadline.saturating_duration_since(Instant::now())));
        }
    }
}
