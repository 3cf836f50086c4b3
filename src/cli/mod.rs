//! CLI argument parsing for doclatch.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// doclatch: crash-safe, resumable run locks for documentation targets.
///
/// Each target directory has one lock record describing the current or last
/// run against it:
/// - A live run with a fresh heartbeat blocks every other run
/// - Interrupted and failed runs leave a checkpoint a later run can resume
/// - Completed runs are kept as an audit trail
#[derive(Parser, Debug)]
#[command(name = "doclatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file to use instead of `<TARGET>/.doclatch/config.yaml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for doclatch.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the lock record of a target.
    ///
    /// Prints the holder, status, progress, heartbeat age, and whether a new
    /// run would be blocked, take over, or resume.
    Status(StatusArgs),

    /// Remove the lock record of a target.
    ///
    /// Refuses while a live run holds the target unless --force is given.
    Clear(ClearArgs),

    /// Run commands in sequence under the target's lock.
    ///
    /// Each --step is one task. If a previous run was interrupted or failed,
    /// the steps it finished are skipped.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Target directory.
    pub target: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Target directory.
    pub target: PathBuf,

    /// Clear even if the holder looks alive.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Target directory. Steps run with it as working directory.
    pub target: PathBuf,

    /// Command line of one step, split with shell quoting rules.
    #[arg(long = "step", value_name = "CMD", required = true)]
    pub steps: Vec<String>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
