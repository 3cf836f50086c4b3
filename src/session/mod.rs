//! Session lifecycle for doclatch.
//!
//! A session is one run of an operation under a target's lock:
//!
//! 1. [`SessionCoordinator::run`] classifies the existing record and writes a
//!    fresh `running` record (or fails with `AlreadyRunning`)
//! 2. a [`HeartbeatPublisher`] refreshes the record in the background
//! 3. a [`TerminationInterceptor`] finalizes the record on signals, panics, and
//!    process exit
//! 4. the operation reports through a [`SessionHandle`]
//! 5. the record is finalized exactly once and both helpers are torn down

mod coordinator;
mod handle;
mod heartbeat;
mod hooks;
mod state;
mod termination;


// Re-export public API
pub use coordinator::{ResumeData, SessionCoordinator};
pub use handle::SessionHandle;
pub use heartbeat::HeartbeatPublisher;
pub use termination::{Termination, TerminationInterceptor, signal_name};
