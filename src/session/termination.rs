//! Termination interception for an active session.
//!
//! While a session is open, SIGINT, SIGTERM and SIGHUP, aborting panics, and
//! `std::process::exit` all finalize the lock record before the process goes
//! away:
//!
//! - signals → `interrupted` ("received SIGINT", ...)
//! - panics → `failed` with the panic message
//! - process exit → `interrupted` ("process exited before the run finished")
//!
//! Finalization is idempotent, so a repeated signal or a panic followed by an
//! exit records only the first cause.

use super::hooks::HookRegistration;
use super::state::SessionState;
use crate::error::Result;
use crate::locks::RunStatus;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use std::sync::Arc;

/// Why a session ended outside the normal success/failure path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// A termination signal was delivered.
    Signal(i32),
    /// A panic reached the panic hook.
    Panic(String),
    /// The process started exiting while the run was open.
    Exit,
}

impl Termination {
    /// Status recorded for this cause.
    pub fn status(&self) -> RunStatus {
        match self {
            Termination::Signal(_) | Termination::Exit => RunStatus::Interrupted,
            Termination::Panic(_) => RunStatus::Failed,
        }
    }

    /// Text stored in the record's `error` field.
    pub fn message(&self) -> String {
        match self {
            Termination::Signal(signal) => format!("received {}", signal_name(*signal)),
            Termination::Panic(message) => format!("panicked: {}", message),
            Termination::Exit => "process exited before the run finished".to_string(),
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGHUP => "SIGHUP",
        _ => "signal",
    }
}

/// Session-scoped registration with the process-wide termination hooks.
///
/// Dropping it (or calling [`unregister`](Self::unregister)) detaches the
/// session; signals arriving afterwards get their default behavior unless
/// another session is open.
pub struct TerminationInterceptor {
    registration: HookRegistration,
}

impl TerminationInterceptor {
    /// Register handlers that finalize `state`.
    ///
    /// With `exit_on_signal`, the process exits with `128 + signo` after the
    /// interrupted record is written.
    pub(crate) fn register(state: Arc<SessionState>, exit_on_signal: bool) -> Result<Self> {
        let registration = HookRegistration::register(
            Arc::new(move |termination: &Termination| state.terminate(termination)),
            exit_on_signal,
        )?;
        Ok(Self { registration })
    }

    /// Remove every handler registered for this session.
    pub fn unregister(self) {
        drop(self.registration);
    }
}
