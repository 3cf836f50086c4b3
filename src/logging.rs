//! Structured logging for doclatch using tracing.
//!
//! Logs go to stderr so command output on stdout stays clean. The level is
//! controlled by `RUST_LOG`; without it, `doclatch=info` (or `doclatch=debug`
//! with `--verbose`).

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init(verbose: bool) {
    let default_directive = if verbose {
        "doclatch=debug"
    } else {
        "doclatch=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(false),
        )
        .try_init();
}
