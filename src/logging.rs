//! Tracing subscriber setup for binaries and tests embedding the crate.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{LineageError, Result};

/// Installs a global `fmt` subscriber filtered by `filter`.
///
/// `filter` uses `EnvFilter` directive syntax, e.g. `"lineage=debug"` or
/// `"info,lineage::branch=trace"`. Fails if the directives do not parse or a
/// global subscriber is already installed.
pub fn init_logging(filter: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(filter).map_err(|_| LineageError::Invalid("invalid log filter"))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| LineageError::Invalid("logging already initialized"))
}
