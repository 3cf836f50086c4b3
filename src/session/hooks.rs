//! Process-wide panic, exit, and signal hooks.
//!
//! A process has one panic hook, one `atexit` list, and one disposition per
//! signal. Each is installed at most once and dispatches to whichever
//! sessions are currently registered. A session's registration is an RAII
//! guard, so sessions come and go without stacking hooks.
//!
//! With no session registered, a termination signal gets its default
//! behavior, so the process is not left ignoring SIGTERM once a run ends.
//!
//! Panics only reach sessions when the build aborts on panic. An unwinding
//! panic is caught by `SessionCoordinator::run` on the operation's own
//! thread; one raised and handled inside the operation (a joined worker, an
//! inner `catch_unwind`) does not end the run.

use super::state::lock_recovering;
use super::termination::Termination;
use crate::error::{LatchError, Result};
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use signal_hook::low_level;
use std::collections::BTreeMap;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once, TryLockError};
use std::thread;
use tracing::warn;

pub(crate) const TERMINATION_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGHUP];

pub(crate) type Callback = Arc<dyn Fn(&Termination) + Send + Sync>;

#[derive(Clone)]
struct Entry {
    exit_on_signal: bool,
    callback: Callback,
}

static ACTIVE: Mutex<BTreeMap<u64, Entry>> = Mutex::new(BTreeMap::new());
static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static INSTALL: Once = Once::new();
static SIGNALS_STARTED: Mutex<bool> = Mutex::new(false);
#[cfg(test)]
static SIGNALS_HANDLED: AtomicU64 = AtomicU64::new(0);

/// Keeps a callback registered until dropped.
#[derive(Debug)]
pub(crate) struct HookRegistration {
    id: u64,
}

impl HookRegistration {
    /// Register `callback` until the guard is dropped.
    ///
    /// With `exit_on_signal`, a termination signal exits the process with
    /// `128 + signo` once every session has recorded it.
    pub(crate) fn register(callback: Callback, exit_on_signal: bool) -> Result<Self> {
        install_process_hooks();
        install_signal_dispatcher()?;

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let entry = Entry {
            exit_on_signal,
            callback,
        };
        lock_recovering(&ACTIVE).insert(id, entry);
        Ok(Self { id })
    }
}

impl Drop for HookRegistration {
    fn drop(&mut self) {
        lock_recovering(&ACTIVE).remove(&self.id);
    }
}

/// Number of sessions currently registered.
pub(crate) fn active_count() -> usize {
    lock_recovering(&ACTIVE).len()
}

/// Signals the dispatcher thread has finished handling.
#[cfg(test)]
pub(crate) fn signals_handled() -> u64 {
    SIGNALS_HANDLED.load(Ordering::SeqCst)
}

/// Entries are cloned out so no callback runs while the registry is locked.
/// A hook firing on a thread that already holds the registry (a panic inside
/// `register`) sees no sessions instead of deadlocking.
fn snapshot() -> Vec<Entry> {
    match ACTIVE.try_lock() {
        Ok(active) => active.values().cloned().collect(),
        Err(TryLockError::Poisoned(poison)) => poison.into_inner().values().cloned().collect(),
        Err(TryLockError::WouldBlock) => Vec::new(),
    }
}

/// Run every registered callback.
pub(crate) fn dispatch(termination: &Termination) {
    for entry in snapshot() {
        (entry.callback)(termination);
    }
}

/// What the dispatcher does after a termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalAction {
    /// No session was open: behave as if no handler were installed.
    Default,
    /// Sessions recorded the signal and keep running.
    Continue,
    /// Sessions recorded the signal and one of them asked to exit.
    Exit,
}

/// Record `signal` in every open session.
pub(crate) fn deliver_signal(signal: i32) -> SignalAction {
    let entries = snapshot();
    if entries.is_empty() {
        return SignalAction::Default;
    }

    let termination = Termination::Signal(signal);
    for entry in &entries {
        (entry.callback)(&termination);
    }
    if entries.iter().any(|entry| entry.exit_on_signal) {
        SignalAction::Exit
    } else {
        SignalAction::Continue
    }
}

fn install_signal_dispatcher() -> Result<()> {
    let mut started = lock_recovering(&SIGNALS_STARTED);
    if *started {
        return Ok(());
    }

    let mut signals = Signals::new(TERMINATION_SIGNALS).map_err(|e| {
        LatchError::Persist(format!("failed to register signal handlers: {}", e))
    })?;
    thread::Builder::new()
        .name("doclatch-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                let action = deliver_signal(signal);
                #[cfg(test)]
                SIGNALS_HANDLED.fetch_add(1, Ordering::SeqCst);
                match action {
                    SignalAction::Continue => {}
                    SignalAction::Exit => std::process::exit(128 + signal),
                    SignalAction::Default => {
                        if let Err(e) = low_level::emulate_default_handler(signal) {
                            warn!(signal, error = %e, "failed to apply default signal action");
                        }
                    }
                }
            }
        })
        .map_err(|e| LatchError::Persist(format!("failed to start signal thread: {}", e)))?;

    *started = true;
    Ok(())
}

fn install_process_hooks() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if cfg!(panic = "abort") {
                let payload = panic_payload_message(info.payload());
                let message = match info.location() {
                    Some(location) => format!("{} at {}", payload, location),
                    None => payload,
                };
                dispatch(&Termination::Panic(message));
            }
            previous(info);
        }));

        // SAFETY: `run_exit_hooks` is a plain `extern "C"` function that does
        // not unwind; registering it has no other preconditions.
        let rc = unsafe { libc::atexit(run_exit_hooks) };
        if rc != 0 {
            warn!("failed to register process exit hook");
        }
    });
}

extern "C" fn run_exit_hooks() {
    // Unwinding out of an atexit handler aborts the process.
    let _ = panic::catch_unwind(|| dispatch(&Termination::Exit));
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
