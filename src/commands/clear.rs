//! Implementation of the `doclatch clear` command.

use super::load_config;
use crate::cli::ClearArgs;
use crate::error::{LatchError, Result};
use crate::session::SessionCoordinator;
use std::path::Path;

/// Execute the `doclatch clear` command.
///
/// Without `--force`, a record held by a live run is left alone.
pub fn cmd_clear(config_path: Option<&Path>, args: ClearArgs) -> Result<()> {
    let config = load_config(config_path, &args.target)?;
    let coordinator = SessionCoordinator::new(config);

    let cleared = match coordinator.clear(&args.target, args.force) {
        Ok(cleared) => cleared,
        Err(LatchError::AlreadyRunning(record)) => {
            eprintln!(
                "Refusing to clear a lock held by a live run.\n\
                 Only clear it if you are certain the holder has stopped:\n  \
                 doclatch clear {} --force",
                args.target.display()
            );
            return Err(LatchError::AlreadyRunning(record));
        }
        Err(e) => return Err(e),
    };

    let Some(record) = cleared else {
        println!("No lock record for {}", args.target.display());
        return Ok(());
    };

    println!("Cleared lock record for {}", args.target.display());
    println!();
    println!("Record details:");
    println!("  Owner:      pid {} on {}", record.owner_id, record.hostname);
    println!("  Status:     {}", record.status);
    println!(
        "  Started:    {}",
        record.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Heartbeat:  {} ago", record.heartbeat_age_string());
    println!("  Progress:   {}%", record.progress_percent);
    if record.checkpoint.is_some() {
        println!("  Checkpoint: discarded");
    }

    Ok(())
}
