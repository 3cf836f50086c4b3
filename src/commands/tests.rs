//! Tests for the command implementations.

use super::*;
use crate::config::LockLocation;
use crate::error::LatchError;
use crate::locks::{Liveness, LockStatus, RunStatus};
use crate::session::SessionCoordinator;
use crate::test_support::{FakeProbe, create_test_target, record_with, test_config};
use serde_json::json;
use serial_test::serial;
use std::fs;

fn steps(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// run
// ============================================================================

#[test]
#[serial]
fn test_run_executes_steps_in_order() {
    let config = test_config();
    let (temp, ctx, store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);

    let summary = run_steps(
        &coordinator,
        &ctx.target,
        &steps(&["sh -c 'echo one >> log.txt'", "sh -c 'echo two >> log.txt'"]),
    )
    .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.executed, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(
        fs::read_to_string(temp.path().join("log.txt")).unwrap(),
        "one\ntwo\n"
    );

    let record = store.read().unwrap().unwrap();
    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.run_id, summary.run_id);
    assert_eq!(record.completed_tasks, vec!["step-1", "step-2"]);
    assert_eq!(
        record.checkpoint,
        Some(json!({"next_step": 2, "total_steps": 2}))
    );
}

#[test]
#[serial]
fn test_failing_step_fails_run_and_keeps_checkpoint() {
    let config = test_config();
    let (temp, ctx, store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);

    let err = run_steps(
        &coordinator,
        &ctx.target,
        &steps(&["true", "false", "sh -c 'echo never > never.txt'"]),
    )
    .unwrap_err();

    assert!(matches!(err, LatchError::StepFailed(_)));
    assert_eq!(err.exit_code(), crate::exit_codes::STEP_FAILURE);
    assert!(!temp.path().join("never.txt").exists());

    let record = store.read().unwrap().unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.completed_tasks, vec!["step-1"]);
    assert_eq!(
        record.checkpoint,
        Some(json!({"next_step": 1, "total_steps": 3}))
    );
    assert_eq!(record.progress_percent, 33);
    assert!(record.error.unwrap().contains("step 2 ('false')"));
}

#[test]
#[serial]
fn test_resumed_run_skips_finished_steps() {
    let config = test_config();
    let (temp, ctx, store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);
    let plan = steps(&["sh -c 'echo one >> log.txt'", "test -f ready"]);

    run_steps(&coordinator, &ctx.target, &plan).unwrap_err();
    assert_eq!(store.read().unwrap().unwrap().status, RunStatus::Failed);

    fs::write(temp.path().join("ready"), "").unwrap();
    let summary = run_steps(&coordinator, &ctx.target, &plan).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.executed, 1);
    assert_eq!(fs::read_to_string(temp.path().join("log.txt")).unwrap(), "one\n");

    let record = store.read().unwrap().unwrap();
    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.completed_tasks, vec!["step-1", "step-2"]);
}

#[test]
#[serial]
fn test_changed_step_list_starts_over() {
    let config = test_config();
    let (temp, ctx, _store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);

    run_steps(
        &coordinator,
        &ctx.target,
        &steps(&["sh -c 'echo a >> log.txt'", "false"]),
    )
    .unwrap_err();

    let summary = run_steps(
        &coordinator,
        &ctx.target,
        &steps(&["sh -c 'echo a >> log.txt'", "true", "true"]),
    )
    .unwrap();

    assert_eq!(summary.skipped, 0);
    assert_eq!(fs::read_to_string(temp.path().join("log.txt")).unwrap(), "a\na\n");
}

#[test]
#[serial]
fn test_completed_run_is_not_resumed() {
    let config = test_config();
    let (temp, ctx, _store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);
    let plan = steps(&["sh -c 'echo x >> log.txt'"]);

    run_steps(&coordinator, &ctx.target, &plan).unwrap();
    let summary = run_steps(&coordinator, &ctx.target, &plan).unwrap();

    assert_eq!(summary.skipped, 0);
    assert_eq!(fs::read_to_string(temp.path().join("log.txt")).unwrap(), "x\nx\n");
}

#[test]
#[serial]
fn test_missing_program_is_step_failure() {
    let config = test_config();
    let (_temp, ctx, store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);

    let err = run_steps(
        &coordinator,
        &ctx.target,
        &steps(&["doclatch-no-such-program-xyz"]),
    )
    .unwrap_err();

    assert!(matches!(err, LatchError::StepFailed(_)));
    assert_eq!(store.read().unwrap().unwrap().status, RunStatus::Failed);
}

#[test]
#[serial]
fn test_unparseable_step_never_takes_lock() {
    let config = test_config();
    let (_temp, ctx, store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);

    let err = run_steps(&coordinator, &ctx.target, &steps(&["true", "echo 'oops"])).unwrap_err();

    assert!(matches!(err, LatchError::UserError(_)));
    assert!(store.read().unwrap().is_none());
}

#[test]
#[serial]
fn test_run_blocked_by_live_holder() {
    let config = test_config();
    let (temp, ctx, store) = create_test_target(&config);
    let holder = record_with(RunStatus::Running, 4242, 1);
    store.write(&holder).unwrap();
    let coordinator = SessionCoordinator::with_probe(config, FakeProbe::with_alive(&[4242]));

    let err = run_steps(
        &coordinator,
        &ctx.target,
        &steps(&["sh -c 'echo ran > ran.txt'"]),
    )
    .unwrap_err();

    assert!(matches!(err, LatchError::AlreadyRunning(_)));
    assert_eq!(err.exit_code(), crate::exit_codes::LOCK_FAILURE);
    assert!(!temp.path().join("ran.txt").exists());
    assert_eq!(store.read().unwrap().unwrap(), holder);
}

#[test]
#[serial]
fn test_signal_stops_remaining_steps() {
    let config = test_config();
    let (temp, ctx, store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);

    let err = run_steps(
        &coordinator,
        &ctx.target,
        &steps(&[
            "sh -c 'kill -TERM $PPID; sleep 1'",
            "sh -c 'echo never > never.txt'",
        ]),
    )
    .unwrap_err();

    assert!(matches!(err, LatchError::Interrupted(_)));
    assert_eq!(err.exit_code(), crate::exit_codes::INTERRUPTED);
    assert!(!temp.path().join("never.txt").exists());

    let record = store.read().unwrap().unwrap();
    assert_eq!(record.status, RunStatus::Interrupted);
    assert_eq!(record.error.as_deref(), Some("received SIGTERM"));
    assert!(record.completed_tasks.is_empty());
}

#[test]
fn test_run_rejects_empty_step_list() {
    let config = test_config();
    let (_temp, ctx, _store) = create_test_target(&config);
    let coordinator = SessionCoordinator::new(config);

    let err = run_steps(&coordinator, &ctx.target, &[]).unwrap_err();
    assert!(matches!(err, LatchError::UserError(_)));
}

// ============================================================================
// status
// ============================================================================

#[test]
fn test_status_lines_without_record() {
    let status = LockStatus {
        path: "/work/docs/.doclatch/session.json".into(),
        record: None,
        liveness: Liveness::Absent,
        corrupt: None,
    };

    let lines = status_lines(&status);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Lock:       /work/docs/.doclatch/session.json");
    assert!(lines[1].starts_with("State:      absent"));
}

#[test]
fn test_status_lines_for_failed_run() {
    let mut record = record_with(RunStatus::Failed, 4242, 90);
    record.current_phase = "step-2 false".to_string();
    record.progress_percent = 50;
    record.completed_tasks = vec!["step-1".to_string()];
    record.checkpoint = Some(json!({"next_step": 1}));
    record.error = Some("step 2 ('false') exited with exit status: 1".to_string());

    let status = LockStatus {
        path: "/work/docs/.doclatch/session.json".into(),
        record: Some(record),
        liveness: Liveness::Resumable,
        corrupt: None,
    };
    let report = status_lines(&status).join("\n");

    assert!(report.contains("State:      resumable"));
    assert!(report.contains("Status:     failed"));
    assert!(report.contains("Owner:      pid 4242"));
    assert!(report.contains("Heartbeat:  1m "));
    assert!(report.contains("Phase:      step-2 false"));
    assert!(report.contains("Progress:   50%"));
    assert!(report.contains("Tasks:      1 completed (last: step-1)"));
    assert!(report.contains(r#"Checkpoint: {"next_step":1}"#));
    assert!(report.contains("Error:      step 2"));
}

#[test]
fn test_status_lines_for_corrupt_record() {
    let status = LockStatus {
        path: "/work/docs/.doclatch/session.json".into(),
        record: None,
        liveness: Liveness::Absent,
        corrupt: Some("expected value at line 1 column 1".to_string()),
    };

    let report = status_lines(&status).join("\n");
    assert!(report.contains("Corrupt:    expected value"));
}

// ============================================================================
// config loading
// ============================================================================

#[test]
fn test_load_config_defaults_without_file() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = load_config(None, temp.path()).unwrap();
    assert_eq!(config.heartbeat_interval_secs, 5);
    assert_eq!(config.lock_location, LockLocation::Target);
}

#[test]
fn test_load_config_reads_target_file() {
    let temp = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".doclatch")).unwrap();
    fs::write(
        temp.path().join(".doclatch").join("config.yaml"),
        "heartbeat_interval_secs: 2\nstale_threshold_secs: 10\n",
    )
    .unwrap();

    let config = load_config(None, temp.path()).unwrap();
    assert_eq!(config.heartbeat_interval_secs, 2);
    assert_eq!(config.stale_threshold_secs, 10);
}

#[test]
fn test_load_config_explicit_path_must_exist() {
    let temp = tempfile::TempDir::new().unwrap();
    let missing = temp.path().join("missing.yaml");
    let err = load_config(Some(missing.as_path()), temp.path()).unwrap_err();
    assert!(matches!(err, LatchError::UserError(_)));
}

#[test]
fn test_load_config_rejects_invalid_values() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("doclatch.yaml");
    fs::write(&path, "heartbeat_interval_secs: 10\nstale_threshold_secs: 20\n").unwrap();

    let err = load_config(Some(path.as_path()), temp.path()).unwrap_err();
    assert!(err.to_string().contains("stale_threshold_secs"));
}
