//! Error types for doclatch.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use crate::locks::LockRecord;
use thiserror::Error;

/// Main error type for lock and session operations.
///
/// Each variant maps to a specific exit code.
#[derive(Error, Debug)]
pub enum LatchError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// Another live process holds the lock for this target.
    #[error("a run is already in progress ({0})")]
    AlreadyRunning(Box<LockRecord>),

    /// The lock record exists but could not be parsed.
    #[error("corrupt lock record: {0}")]
    CorruptRecord(String),

    /// The lock record could not be written or removed.
    #[error("failed to persist lock record: {0}")]
    Persist(String),

    /// A command run under the session lock failed.
    #[error("step failed: {0}")]
    StepFailed(String),

    /// A signal or process exit ended the run before the operation returned.
    #[error("run was interrupted: {0}")]
    Interrupted(String),
}

impl LatchError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LatchError::UserError(_) => exit_codes::USER_ERROR,
            LatchError::CorruptRecord(_) => exit_codes::USER_ERROR,
            LatchError::AlreadyRunning(_) => exit_codes::LOCK_FAILURE,
            LatchError::Persist(_) => exit_codes::PERSIST_FAILURE,
            LatchError::StepFailed(_) => exit_codes::STEP_FAILURE,
            LatchError::Interrupted(_) => exit_codes::INTERRUPTED,
        }
    }
}

/// Result type alias for doclatch operations.
pub type Result<T> = std::result::Result<T, LatchError>;

/// Outcome of a failed `SessionCoordinator::run`.
///
/// Coordination failures and failures of the operation itself are kept apart
/// so the operation's error reaches the caller unchanged.
#[derive(Error, Debug)]
pub enum RunError<E> {
    /// The lock could not be acquired or the outcome could not be recorded.
    #[error(transparent)]
    Session(#[from] LatchError),

    /// The operation returned an error; the record was finalized as failed.
    #[error("{0}")]
    Operation(E),
}

impl<E> RunError<E> {
    /// The foreign record, if acquisition was refused.
    pub fn already_running(&self) -> Option<&LockRecord> {
        match self {
            RunError::Session(LatchError::AlreadyRunning(record)) => Some(record),
            _ => None,
        }
    }
}
