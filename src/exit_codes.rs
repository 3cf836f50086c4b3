//! Exit code constants for the doclatch CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: A `run` step failed
//! - 3: The run was interrupted before it finished
//! - 4: The target is locked by an active run
//! - 5: The lock record could not be persisted

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable or invalid config.
pub const USER_ERROR: i32 = 1;

/// A step executed by `doclatch run` exited unsuccessfully.
pub const STEP_FAILURE: i32 = 2;

/// A signal or process exit ended the run while its operation was still going.
pub const INTERRUPTED: i32 = 3;

/// Lock acquisition failure: another live process holds the target.
pub const LOCK_FAILURE: i32 = 4;

/// The lock record could not be written or removed.
pub const PERSIST_FAILURE: i32 = 5;
