//! Command implementations for doclatch.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod clear;
mod run;
mod status;

#[cfg(test)]
mod tests;

pub use run::{RunSummary, run_steps};
pub use status::status_lines;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::target_config_path;
use crate::error::Result;
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Status(args) => status::cmd_status(config_path, args),
        Command::Clear(args) => clear::cmd_clear(config_path, args),
        Command::Run(args) => run::cmd_run(config_path, args),
    }
}

/// Config for a command on `target`.
///
/// An explicit `--config` must exist. Otherwise the target's own
/// `.doclatch/config.yaml` is used when present, and defaults when not.
pub fn load_config(explicit: Option<&Path>, target: &Path) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => Config::load_or_default(target_config_path(target)),
    }
}
