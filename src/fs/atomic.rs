//! Atomic filesystem writes for lock records.
//!
//! A record is never left half-written, even when the process dies mid-write
//! (including writes issued from signal, panic, or exit handlers).
//!
//! # Implementation Strategy
//!
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Atomically replace the original file
//!
//! `rename()` is atomic as long as source and destination are on the same
//! filesystem, which holds because the temp file sits next to the target.
//!
//! # Temporary Files
//!
//! Temp files are named `.{filename}.{pid}.{seq}.tmp`, so writers in different
//! threads or processes never share one. A crash can leave one behind; it is
//! never read back.

use crate::error::{LatchError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Atomically write bytes to a file.
///
/// Writes the content to a temporary file, syncs it to disk, and then
/// atomically replaces the target file.
///
/// # Example
///
/// ```no_run
/// use doclatch::fs::atomic_write;
/// use std::path::Path;
///
/// atomic_write(Path::new("session.json"), b"{}")?;
/// # Ok::<(), doclatch::error::LatchError>(())
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            LatchError::Persist(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    atomic_replace(&temp_path, path)?;

    Ok(())
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            LatchError::Persist(format!("invalid record path '{}'", target.display()))
        })?;

    let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{}.{}.{}.tmp", filename, std::process::id(), seq);
    Ok(parent.join(temp_name))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        LatchError::Persist(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        LatchError::Persist(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        LatchError::Persist(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        LatchError::Persist(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    // Persist the directory entry as well.
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
