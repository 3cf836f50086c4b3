//! Background heartbeat for an active session.

use super::state::{SessionState, Tick};
use crate::error::{LatchError, Result};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Refreshes the record's heartbeat on a fixed interval.
///
/// Each tick re-reads the record, then writes the in-memory record (which
/// carries any buffered phase/progress/checkpoint updates) with a fresh
/// `last_heartbeat_at`. A failed write is logged and retried on the next tick.
///
/// The thread exits when [`stop`](Self::stop) is called, when the publisher is
/// dropped, when the session is finalized, or when the record on disk no
/// longer belongs to this run.
pub struct HeartbeatPublisher {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl HeartbeatPublisher {
    pub(crate) fn start(state: Arc<SessionState>, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("doclatch-heartbeat".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    match state.heartbeat() {
                        Ok(Tick::Written) => debug!(run_id = %state.run_id(), "heartbeat"),
                        Ok(Tick::Finalized) => break,
                        Ok(Tick::Superseded(Some(other))) => {
                            warn!(
                                run_id = %state.run_id(),
                                holder = %other,
                                "lock record no longer held by this run; stopping heartbeat"
                            );
                            break;
                        }
                        Ok(Tick::Superseded(None)) => {
                            warn!(
                                run_id = %state.run_id(),
                                path = %state.store().path().display(),
                                "lock record removed externally; stopping heartbeat"
                            );
                            break;
                        }
                        Err(e) => warn!(run_id = %state.run_id(), error = %e, "missed heartbeat"),
                    }
                }
            })
            .map_err(|e| LatchError::Persist(format!("failed to start heartbeat thread: {}", e)))?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Stop ticking and wait for an in-flight tick to finish.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for HeartbeatPublisher {
    fn drop(&mut self) {
        self.halt();
    }
}
