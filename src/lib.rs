//! doclatch: crash-safe, heartbeat-verified, resumable run locks.
//!
//! Long documentation runs take a per-target lock through
//! [`session::SessionCoordinator::run`]. The lock record on disk always says
//! who holds the target, how far the run got, and how it ended, even when the
//! process is killed, panics, or exits early.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod logging;
pub mod session;

#[cfg(test)]
mod test_support;
