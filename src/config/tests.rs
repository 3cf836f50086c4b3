//! Tests for config functionality.

use crate::config::{Config, LockLocation};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.heartbeat_interval_secs, 5);
    assert_eq!(config.stale_threshold_secs, 30);
    assert_eq!(config.lock_location, LockLocation::Target);
    assert!(!config.remove_on_complete);
    assert_eq!(config.finalize_retries, 3);
    assert_eq!(config.finalize_grace_ms, 2000);
    assert!(config.exit_on_signal);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    assert_eq!(config.heartbeat_interval_secs, 5);
    assert_eq!(config.stale_threshold_secs, 30);
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
heartbeat_interval_secs: 10
lock_location: state_dir
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.heartbeat_interval_secs, 10);
    assert_eq!(config.lock_location, LockLocation::StateDir);

    // Unspecified values should use defaults
    assert_eq!(config.stale_threshold_secs, 30);
    assert_eq!(config.finalize_retries, 3);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
heartbeat_interval_secs: 2
stale_threshold_secs: 12
lock_location: state_dir
state_dir: /var/lib/doclatch
remove_on_complete: true
finalize_retries: 5
finalize_grace_ms: 500
exit_on_signal: false
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.heartbeat_interval(), Duration::from_secs(2));
    assert_eq!(config.stale_threshold(), chrono::Duration::seconds(12));
    assert_eq!(config.state_dir.to_str(), Some("/var/lib/doclatch"));
    assert!(config.remove_on_complete);
    assert_eq!(config.finalize_retries, 5);
    assert_eq!(config.finalize_grace(), Duration::from_millis(500));
    assert!(!config.exit_on_signal);
}

#[test]
fn test_unknown_fields_ignored() {
    let yaml = r#"
heartbeat_interval_secs: 5
future_setting: whatever
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.heartbeat_interval_secs, 5);
}

#[test]
fn test_zero_heartbeat_interval_rejected() {
    let err = Config::from_yaml("heartbeat_interval_secs: 0").unwrap_err();
    assert!(err.to_string().contains("heartbeat_interval_secs"));
}

#[test]
fn test_threshold_must_cover_three_intervals() {
    let yaml = r#"
heartbeat_interval_secs: 10
stale_threshold_secs: 25
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("at least 3x"));

    let yaml = r#"
heartbeat_interval_secs: 10
stale_threshold_secs: 30
"#;
    assert!(Config::from_yaml(yaml).is_ok());
}

#[test]
fn test_zero_finalize_retries_rejected() {
    let err = Config::from_yaml("finalize_retries: 0").unwrap_err();
    assert!(err.to_string().contains("finalize_retries"));
}

#[test]
fn test_invalid_lock_location_rejected() {
    let result = Config::from_yaml("lock_location: nowhere");
    assert!(result.is_err());
}

#[test]
fn test_yaml_roundtrip() {
    let mut config = Config::default();
    config.stale_threshold_secs = 60;
    config.remove_on_complete = true;

    let yaml = config.to_yaml().unwrap();
    let parsed = Config::from_yaml(&yaml).unwrap();

    assert_eq!(parsed.stale_threshold_secs, 60);
    assert!(parsed.remove_on_complete);
}

#[test]
fn test_load_or_default_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_or_default(temp_dir.path().join("missing.yaml")).unwrap();
    assert_eq!(config.heartbeat_interval_secs, 5);
}

#[test]
fn test_load_reports_path_on_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    std::fs::write(&path, "heartbeat_interval_secs: [not a number]").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("failed to parse config YAML"));
}
