//! Filesystem utilities for doclatch.
//!
//! Lock records are only ever written through [`atomic_write`], so a reader
//! never observes a partially written record.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
