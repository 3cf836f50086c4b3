//! Classification of an existing lock record.
//!
//! # PID Verification
//!
//! Operating systems reuse PIDs, so a live PID does not prove the original
//! holder is still running. The heartbeat timestamp is the primary safety net:
//! a `running` record is only trusted while its heartbeat is fresh. The PID
//! probe is a fast path that lets a new run take over immediately when the
//! holder is clearly gone.
//!
//! Records written on another host cannot be probed; for those the heartbeat
//! alone decides.

use super::record::{LockRecord, RunStatus};
use chrono::{DateTime, Duration, Utc};

/// How an existing record affects a new acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No record on disk.
    Absent,
    /// A live process with a fresh heartbeat holds the target.
    ForeignActive,
    /// A `running` record whose holder is dead or silent.
    Reclaimable,
    /// An interrupted or failed run whose checkpoint may seed a new run.
    Resumable,
    /// A completed run; a new run starts clean.
    Terminal,
}

impl Liveness {
    /// Whether a new run may take over the target.
    pub fn allows_acquire(self) -> bool {
        !matches!(self, Liveness::ForeignActive)
    }

    /// Whether a new run should be handed the prior checkpoint.
    pub fn offers_resume(self) -> bool {
        matches!(self, Liveness::Reclaimable | Liveness::Resumable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Liveness::Absent => "absent",
            Liveness::ForeignActive => "active",
            Liveness::Reclaimable => "reclaimable",
            Liveness::Resumable => "resumable",
            Liveness::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether a process id currently refers to a running process.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probes the local process table with a null signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> bool {
        is_pid_alive(pid)
    }
}

/// `kill(pid, 0)`: success or `EPERM` (exists, owned by someone else) means alive.
pub fn is_pid_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs permission and existence checks only.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Classify `record` at time `now`.
///
/// `stale_after` is the maximum heartbeat age for a `running` record to be
/// trusted.
pub fn classify(
    record: Option<&LockRecord>,
    now: DateTime<Utc>,
    stale_after: Duration,
    probe: &dyn ProcessProbe,
) -> Liveness {
    let Some(record) = record else {
        return Liveness::Absent;
    };

    match record.status {
        RunStatus::Running => {
            let owner_alive = !record.is_local() || probe.is_alive(record.owner_id);
            let fresh = record.heartbeat_age(now) < stale_after;
            if owner_alive && fresh {
                Liveness::ForeignActive
            } else {
                Liveness::Reclaimable
            }
        }
        status if status.is_resumable() => Liveness::Resumable,
        _ => Liveness::Terminal,
    }
}
