//! Implementation of the `doclatch run` command.
//!
//! Runs a fixed list of commands under the target's lock. Step `n` (1-based)
//! is task `step-n`. After each step the checkpoint records the index of the
//! next step, so a run that resumes an interrupted or failed one skips the
//! steps that already succeeded.

use super::load_config;
use crate::cli::RunArgs;
use crate::error::{LatchError, Result, RunError};
use crate::locks::ProcessProbe;
use crate::session::{ResumeData, SessionCoordinator, SessionHandle};
use serde_json::json;
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

const NEXT_STEP_KEY: &str = "next_step";
const TOTAL_STEPS_KEY: &str = "total_steps";

/// Outcome of a successful `doclatch run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: String,
    pub total: usize,
    /// Steps skipped because a previous run finished them.
    pub skipped: usize,
    pub executed: usize,
}

#[derive(Debug, Clone)]
struct Step {
    line: String,
    program: String,
    args: Vec<String>,
}

/// Execute the `doclatch run` command.
pub fn cmd_run(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let config = load_config(config_path, &args.target)?;
    let coordinator = SessionCoordinator::new(config);

    let summary = run_steps(&coordinator, &args.target, &args.steps)?;

    println!(
        "Completed {} of {} step(s) in {}",
        summary.executed,
        summary.total,
        args.target.display()
    );
    if summary.skipped > 0 {
        println!("  Skipped:  {} step(s) finished by an earlier run", summary.skipped);
    }
    println!("  Run:      {}", summary.run_id);

    Ok(())
}

/// Run `steps` in order under `coordinator`'s lock on `target`.
///
/// Every step is parsed before the lock is taken, so a typo never leaves a
/// failed record behind.
pub fn run_steps<P: ProcessProbe>(
    coordinator: &SessionCoordinator<P>,
    target: &Path,
    steps: &[String],
) -> Result<RunSummary> {
    if steps.is_empty() {
        return Err(LatchError::UserError("no steps to run".to_string()));
    }
    let steps = steps
        .iter()
        .map(|line| parse_step(line))
        .collect::<Result<Vec<_>>>()?;
    let workdir = target.to_path_buf();

    coordinator
        .run(target, |handle, resume| execute(handle, resume, &workdir, &steps))
        .map_err(|e| match e {
            RunError::Session(e) | RunError::Operation(e) => e,
        })
}

fn parse_step(line: &str) -> Result<Step> {
    let words = shell_words::split(line).map_err(|e| {
        LatchError::UserError(format!(
            "failed to parse step '{}': {}\n\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            line, e
        ))
    })?;

    let Some((program, args)) = words.split_first() else {
        return Err(LatchError::UserError(format!(
            "step is empty after parsing: '{}'",
            line
        )));
    };

    Ok(Step {
        line: line.to_string(),
        program: program.clone(),
        args: args.to_vec(),
    })
}

fn execute(
    handle: &SessionHandle,
    resume: Option<ResumeData>,
    workdir: &Path,
    steps: &[Step],
) -> Result<RunSummary> {
    let total = steps.len();
    let start = resume.as_ref().map_or(0, |resume| resume_point(resume, total));
    if start > 0 {
        info!(skipped = start, total, "resuming after steps finished by an earlier run");
        handle.update_progress(percent(start, total));
    }

    for (index, step) in steps.iter().enumerate().skip(start) {
        let number = index + 1;
        if handle.is_interrupted() {
            return Err(LatchError::Interrupted(format!(
                "stopped before step {} of {}",
                number, total
            )));
        }
        handle.update_phase(format!("{} {}", step_task_id(index), step.program));
        info!(step = number, total, command = %step.line, "running step");

        let status = Command::new(&step.program)
            .args(&step.args)
            .current_dir(workdir)
            .status()
            .map_err(|e| {
                LatchError::StepFailed(format!(
                    "step {} ('{}') could not be started: {}",
                    number, step.line, e
                ))
            })?;

        if !status.success() {
            return Err(LatchError::StepFailed(format!(
                "step {} ('{}') exited with {}",
                number, step.line, status
            )));
        }

        handle.mark_task_complete(step_task_id(index));
        handle.set_checkpoint(json!({ NEXT_STEP_KEY: number, TOTAL_STEPS_KEY: total }));
        handle.update_progress(percent(number, total));
    }

    Ok(RunSummary {
        run_id: handle.run_id().to_string(),
        total,
        skipped: start,
        executed: total - start,
    })
}

/// Index of the first step a resumed run still has to execute.
fn resume_point(resume: &ResumeData, total: usize) -> usize {
    let Some(checkpoint) = &resume.checkpoint else {
        return 0;
    };

    let recorded_total = checkpoint.get(TOTAL_STEPS_KEY).and_then(|v| v.as_u64());
    if recorded_total != Some(total as u64) {
        warn!(
            recorded = ?recorded_total,
            total,
            "step list changed since the interrupted run; starting over"
        );
        return 0;
    }

    checkpoint
        .get(NEXT_STEP_KEY)
        .and_then(|v| v.as_u64())
        .map_or(0, |next| (next as usize).min(total))
}

fn step_task_id(index: usize) -> String {
    format!("step-{}", index + 1)
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::RunStatus;

    fn resume_with(checkpoint: Option<serde_json::Value>) -> ResumeData {
        ResumeData {
            previous_status: RunStatus::Interrupted,
            previous_owner: 1,
            previous_run_id: "01J0000000000000000000000".to_string(),
            checkpoint,
            completed_tasks: Vec::new(),
            current_phase: String::new(),
            progress_percent: 0,
            error: None,
        }
    }

    #[test]
    fn test_parse_step_splits_with_shell_quoting() {
        let step = parse_step("sh -c 'echo hello world'").unwrap();
        assert_eq!(step.program, "sh");
        assert_eq!(step.args, vec!["-c", "echo hello world"]);
        assert_eq!(step.line, "sh -c 'echo hello world'");
    }

    #[test]
    fn test_parse_step_rejects_unmatched_quote() {
        let err = parse_step("echo \"unmatched").unwrap_err();
        assert!(matches!(err, LatchError::UserError(_)));
    }

    #[test]
    fn test_parse_step_rejects_empty() {
        assert!(matches!(parse_step("   "), Err(LatchError::UserError(_))));
    }

    #[test]
    fn test_resume_point_from_checkpoint() {
        let resume = resume_with(Some(json!({"next_step": 2, "total_steps": 3})));
        assert_eq!(resume_point(&resume, 3), 2);
    }

    #[test]
    fn test_resume_point_restarts_when_step_count_changed() {
        let resume = resume_with(Some(json!({"next_step": 2, "total_steps": 5})));
        assert_eq!(resume_point(&resume, 3), 0);
    }

    #[test]
    fn test_resume_point_without_usable_checkpoint() {
        assert_eq!(resume_point(&resume_with(None), 3), 0);
        assert_eq!(resume_point(&resume_with(Some(json!("opaque"))), 3), 0);
    }

    #[test]
    fn test_resume_point_is_clamped() {
        let resume = resume_with(Some(json!({"next_step": 9, "total_steps": 3})));
        assert_eq!(resume_point(&resume, 3), 3);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
