//! Acquire, run, finalize.

use super::handle::SessionHandle;
use super::heartbeat::HeartbeatPublisher;
use super::hooks::panic_payload_message;
use super::state::{SessionState, lock_recovering};
use super::termination::TerminationInterceptor;
use crate::config::Config;
use crate::context::TargetContext;
use crate::error::{LatchError, Result, RunError};
use crate::locks::{
    Liveness, LockRecord, LockStatus, LockStore, ProcessProbe, RunStatus, SystemProbe, classify,
};
use chrono::Utc;
use serde_json::Value;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Serializes read-classify-write between threads of this process.
static ACQUIRE: Mutex<()> = Mutex::new(());

/// What a previous, unfinished run left behind.
///
/// Handed to the operation when the prior record was `Reclaimable` or
/// `Resumable`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeData {
    pub previous_status: RunStatus,
    pub previous_owner: u32,
    pub previous_run_id: String,
    pub checkpoint: Option<Value>,
    pub completed_tasks: Vec<String>,
    pub current_phase: String,
    pub progress_percent: u8,
    pub error: Option<String>,
}

impl From<LockRecord> for ResumeData {
    fn from(record: LockRecord) -> Self {
        Self {
            previous_status: record.status,
            previous_owner: record.owner_id,
            previous_run_id: record.run_id,
            checkpoint: record.checkpoint,
            completed_tasks: record.completed_tasks,
            current_phase: record.current_phase,
            progress_percent: record.progress_percent,
            error: record.error,
        }
    }
}

/// Runs operations under a per-target lock.
///
/// # Example
///
/// ```no_run
/// use doclatch::config::Config;
/// use doclatch::session::SessionCoordinator;
///
/// let coordinator = SessionCoordinator::new(Config::default());
/// let pages = coordinator.run("docs", |handle, resume| {
///     if let Some(resume) = &resume {
///         println!("resuming at {}%", resume.progress_percent);
///     }
///     handle.update_phase("writing");
///     handle.update_progress(50);
///     handle.mark_task_complete("index.md");
///     Ok::<_, std::io::Error>(1)
/// })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SessionCoordinator<P: ProcessProbe = SystemProbe> {
    config: Config,
    probe: P,
}

impl SessionCoordinator<SystemProbe> {
    pub fn new(config: Config) -> Self {
        Self::with_probe(config, SystemProbe)
    }
}

impl<P: ProcessProbe> SessionCoordinator<P> {
    /// Use a custom process probe for liveness checks.
    pub fn with_probe(config: Config, probe: P) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `operation` while holding the lock for `target`.
    ///
    /// The lock record is finalized on every path: `completed` on `Ok`,
    /// `failed` on `Err` or panic, `interrupted` on a termination signal or
    /// process exit. Panics are re-raised after the record is written. An
    /// operation that returns after a signal ended its run gets
    /// [`LatchError::Interrupted`] instead of its value.
    pub fn run<T, E, F>(
        &self,
        target: impl AsRef<Path>,
        operation: F,
    ) -> std::result::Result<T, RunError<E>>
    where
        E: Display,
        F: FnOnce(&SessionHandle, Option<ResumeData>) -> std::result::Result<T, E>,
    {
        let ctx = TargetContext::resolve(target, &self.config)?;
        let (state, resume) = self.acquire(&ctx)?;
        let (heartbeat, interceptor) = match self.attach(&state) {
            Ok(attached) => attached,
            Err(e) => {
                record_failure(&state, e.to_string());
                return Err(e.into());
            }
        };

        let handle = SessionHandle::new(Arc::clone(&state));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation(&handle, resume)));
        heartbeat.stop();

        let result = match outcome {
            Ok(Ok(value)) => self.complete(&state).map(|()| value).map_err(RunError::from),
            Ok(Err(e)) => {
                record_failure(&state, e.to_string());
                Err(RunError::Operation(e))
            }
            Err(payload) => {
                let message = format!("panicked: {}", panic_payload_message(payload.as_ref()));
                record_failure(&state, message);
                interceptor.unregister();
                panic::resume_unwind(payload);
            }
        };

        interceptor.unregister();
        result
    }

    /// Current record and classification for `target`.
    pub fn status(&self, target: impl AsRef<Path>) -> Result<LockStatus> {
        let ctx = TargetContext::resolve(target, &self.config)?;
        let store = LockStore::for_target(&ctx);

        let (record, corrupt) = match store.read() {
            Ok(record) => (record, None),
            Err(LatchError::CorruptRecord(reason)) => (None, Some(reason)),
            Err(e) => return Err(e),
        };
        let liveness = self.classify(record.as_ref());

        Ok(LockStatus {
            path: store.path().to_path_buf(),
            record,
            liveness,
            corrupt,
        })
    }

    /// Remove the record for `target`.
    ///
    /// An active foreign run is only removed with `force`. Returns the
    /// removed record, or `None` if there was none (or it was corrupt).
    pub fn clear(&self, target: impl AsRef<Path>, force: bool) -> Result<Option<LockRecord>> {
        let ctx = TargetContext::resolve(target, &self.config)?;
        let store = LockStore::for_target(&ctx);
        let _acquire = lock_recovering(&ACQUIRE);

        let record = read_ignoring_corrupt(&store)?;
        let liveness = self.classify(record.as_ref());
        if !liveness.allows_acquire()
            && !force
            && let Some(holder) = &record
        {
            return Err(LatchError::AlreadyRunning(Box::new(holder.clone())));
        }

        if store.remove()? {
            info!(path = %store.path().display(), %liveness, force, "lock record cleared");
        }
        Ok(record)
    }

    /// Write a fresh `running` record unless a live run holds the target.
    fn acquire(&self, ctx: &TargetContext) -> Result<(Arc<SessionState>, Option<ResumeData>)> {
        let store = LockStore::for_target(ctx);
        let _acquire = lock_recovering(&ACQUIRE);

        let existing = read_ignoring_corrupt(&store)?;
        let liveness = self.classify(existing.as_ref());

        let mut record = LockRecord::new_running();
        let resume = match existing {
            Some(existing) if !liveness.allows_acquire() => {
                return Err(LatchError::AlreadyRunning(Box::new(existing)));
            }
            Some(prior) if liveness.offers_resume() => {
                record.checkpoint = prior.checkpoint.clone();
                record.completed_tasks = prior.completed_tasks.clone();
                Some(ResumeData::from(prior))
            }
            _ => None,
        };

        store.write(&record)?;
        match store.read()? {
            Some(on_disk) if on_disk.run_id == record.run_id => {}
            Some(other) => return Err(LatchError::AlreadyRunning(Box::new(other))),
            None => {
                return Err(LatchError::Persist(format!(
                    "lock record '{}' disappeared after it was written",
                    store.path().display()
                )));
            }
        }

        debug!(
            dir = %ctx.target.display(),
            run_id = %record.run_id,
            %liveness,
            resumed = resume.is_some(),
            "lock acquired"
        );

        let state = SessionState::new(
            store,
            record,
            self.config.finalize_retries,
            self.config.finalize_grace(),
        );
        Ok((Arc::new(state), resume))
    }

    fn classify(&self, record: Option<&LockRecord>) -> Liveness {
        classify(record, Utc::now(), self.config.stale_threshold(), &self.probe)
    }

    /// Start the heartbeat and hook into termination. A failed registration
    /// drops (and stops) the heartbeat.
    fn attach(
        &self,
        state: &Arc<SessionState>,
    ) -> Result<(HeartbeatPublisher, TerminationInterceptor)> {
        let heartbeat =
            HeartbeatPublisher::start(Arc::clone(state), self.config.heartbeat_interval())?;
        let interceptor =
            TerminationInterceptor::register(Arc::clone(state), self.config.exit_on_signal)?;
        Ok((heartbeat, interceptor))
    }

    fn complete(&self, state: &SessionState) -> Result<()> {
        if !state.finalize(RunStatus::Completed, None)? {
            let record = state.snapshot();
            warn!(
                run_id = %state.run_id(),
                status = %record.status,
                "operation returned after its run was ended; keeping recorded outcome"
            );
            return Err(LatchError::Interrupted(
                record.error.unwrap_or_else(|| record.status.to_string()),
            ));
        }

        if self.config.remove_on_complete && state.remove_record()? {
            debug!(run_id = %state.run_id(), "lock record removed");
        }
        Ok(())
    }
}

/// A corrupt record counts as absent; it is replaced or removed next.
fn read_ignoring_corrupt(store: &LockStore) -> Result<Option<LockRecord>> {
    match store.read() {
        Err(LatchError::CorruptRecord(reason)) => {
            warn!(path = %store.path().display(), %reason, "ignoring corrupt lock record");
            Ok(None)
        }
        other => other,
    }
}

/// Finalize as `failed`; a write failure is logged, not returned.
fn record_failure(state: &SessionState, message: String) {
    if let Err(e) = state.finalize(RunStatus::Failed, Some(message)) {
        warn!(run_id = %state.run_id(), error = %e, "failed to record run failure");
    }
}
