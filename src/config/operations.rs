//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{LatchError, Result};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LatchError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` if it exists, otherwise return defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml rejects an empty document; treat it as "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LatchError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LatchError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `heartbeat_interval_secs` must be positive
    /// - `stale_threshold_secs` must be at least 3x `heartbeat_interval_secs`
    /// - `finalize_retries` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_secs == 0 {
            return Err(LatchError::UserError(
                "config validation failed: heartbeat_interval_secs must be greater than 0"
                    .to_string(),
            ));
        }

        if self.stale_threshold_secs < self.heartbeat_interval_secs.saturating_mul(3) {
            return Err(LatchError::UserError(format!(
                "config validation failed: stale_threshold_secs ({}) must be at least 3x heartbeat_interval_secs ({})",
                self.stale_threshold_secs, self.heartbeat_interval_secs
            )));
        }

        if self.finalize_retries == 0 {
            return Err(LatchError::UserError(
                "config validation failed: finalize_retries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn stale_threshold(&self) -> chrono::Duration {
        // Clamped well below chrono's range limit.
        chrono::Duration::seconds(self.stale_threshold_secs.min(u32::MAX as u64) as i64)
    }

    pub fn finalize_grace(&self) -> Duration {
        Duration::from_millis(self.finalize_grace_ms)
    }
}
