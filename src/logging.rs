//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Result, TreeError};

/// Installs the global tracing subscriber at the given level.
///
/// `level` accepts anything `EnvFilter` understands; the CLI passes one of
/// `debug`, `info`, `warn`, `error`. Fails if the level cannot be parsed
/// or a subscriber is already installed.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| TreeError::Config(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| TreeError::InvalidArgument("logging already initialized".into()))
}
