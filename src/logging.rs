//! Tracing setup for the `persona` binary.
//!
//! All log output goes to stderr: on the stdio MCP transport, stdout
//! carries the protocol and must stay clean.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies (e.g. `"info"`,
/// or `"debug"` with `--verbose`). Fails if a subscriber is already installed.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
