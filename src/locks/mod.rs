//! Lock record subsystem for doclatch.
//!
//! Each documentation target has exactly one lock record describing the
//! current or last run against it.
//!
//! # Lock Files
//!
//! Records live at `<target>/.doclatch/session.json` or, with
//! `lock_location: state_dir`, at `<state_dir>/locks/<md5>.json`. They are
//! always replaced whole through an atomic temp-file rename; there is no
//! exclusive-create or OS file lock. Mutual exclusion comes from the
//! liveness check on the record contents.
//!
//! # Lock Record
//!
//! Each record contains JSON fields:
//! - `owner_id` / `hostname`: the holder's PID and host
//! - `run_id`: unique id of the writing run
//! - `started_at` / `last_heartbeat_at`: RFC3339 timestamps
//! - `status`: `running`, `interrupted`, `failed`, or `completed`
//! - `current_phase`, `progress_percent`, `completed_tasks`, `checkpoint`
//! - `error`: only for `failed` and `interrupted`

mod liveness;
mod record;
mod store;
mod types;


// Re-export public API
pub use liveness::{Liveness, ProcessProbe, SystemProbe, classify, is_pid_alive};
pub use record::{LockRecord, RunStatus, local_hostname};
pub use store::LockStore;
pub use types::LockStatus;
