//! Configuration model for doclatch.
//!
//! This module defines the Config struct read from `<target>/.doclatch/config.yaml`
//! (or an explicit `--config` path). It supports forward-compatible YAML parsing
//! (unknown fields are ignored), sensible defaults for optional fields, and
//! validation of the heartbeat/staleness ratio.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use types::LockLocation;
