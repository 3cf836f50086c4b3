//! Implementation of the `doclatch status` command.

use super::load_config;
use crate::cli::StatusArgs;
use crate::error::Result;
use crate::locks::{Liveness, LockStatus};
use crate::session::SessionCoordinator;
use std::path::Path;

/// Execute the `doclatch status` command.
pub fn cmd_status(config_path: Option<&Path>, args: StatusArgs) -> Result<()> {
    let config = load_config(config_path, &args.target)?;
    let status = SessionCoordinator::new(config).status(&args.target)?;

    for line in status_lines(&status) {
        println!("{}", line);
    }
    Ok(())
}

/// Human-readable report of a target's lock.
pub fn status_lines(status: &LockStatus) -> Vec<String> {
    let mut lines = vec![
        format!("Lock:       {}", status.path.display()),
        format!("State:      {} ({})", status.liveness, liveness_hint(status.liveness)),
    ];

    if let Some(reason) = &status.corrupt {
        lines.push(format!("Corrupt:    {}", reason));
        lines.push("            a new run ignores this file and starts fresh".to_string());
    }

    let Some(record) = &status.record else {
        return lines;
    };

    lines.push(format!("Status:     {}", record.status));
    lines.push(format!(
        "Owner:      pid {} on {}",
        record.owner_id, record.hostname
    ));
    lines.push(format!("Run:        {}", record.run_id));
    lines.push(format!(
        "Started:    {} ({} ago)",
        record.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        record.age_string()
    ));
    lines.push(format!(
        "Heartbeat:  {} ago",
        record.heartbeat_age_string()
    ));
    if !record.current_phase.is_empty() {
        lines.push(format!("Phase:      {}", record.current_phase));
    }
    lines.push(format!("Progress:   {}%", record.progress_percent));
    if let Some(last) = record.completed_tasks.last() {
        lines.push(format!(
            "Tasks:      {} completed (last: {})",
            record.completed_tasks.len(),
            last
        ));
    }
    if let Some(checkpoint) = &record.checkpoint {
        lines.push(format!("Checkpoint: {}", checkpoint));
    }
    if let Some(error) = &record.error {
        lines.push(format!("Error:      {}", error));
    }

    lines
}

fn liveness_hint(liveness: Liveness) -> &'static str {
    match liveness {
        Liveness::Absent => "no run recorded; a new run starts fresh",
        Liveness::ForeignActive => "held by a live run; new runs are refused",
        Liveness::Reclaimable => "holder is gone; a new run takes over and resumes",
        Liveness::Resumable => "a new run resumes from the last checkpoint",
        Liveness::Terminal => "last run completed; a new run starts fresh",
    }
}
