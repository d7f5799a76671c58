//! Environment-driven configuration.
//!
//! Three options are recognized, all optional:
//!
//! - `TREE_DEGREE` — minimum branching factor, integer >= 2 (default 3)
//! - `STORAGE_PATH` — snapshot file location (default `data/tree.json`)
//! - `LOG_LEVEL` — one of `debug`, `info`, `warn`, `error` (default `info`)
//!
//! An unparsable or out-of-range value is a startup error, never silently
//! replaced with the default.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TreeError};

/// Default snapshot location, relative to the working directory.
pub const DEFAULT_STORAGE_PATH: &str = "data/tree.json";

/// Minimum severity emitted by the logging facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Per-operation mutation tracing.
    Debug,
    /// Lifecycle events (default).
    Info,
    /// Suspicious but non-fatal conditions.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Filter directive understood by the tracing subscriber.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(TreeError::Config(format!("invalid log level: {other}"))),
        }
    }
}

/// Application configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// B-tree minimum degree; node occupancy is bounded by
    /// `[degree - 1, 2 * degree - 1]` keys.
    pub tree_degree: usize,
    /// Where snapshots are written and read.
    pub storage_path: PathBuf,
    /// Minimum log severity.
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tree_degree: 3,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Reads the configuration from environment variables, starting from
    /// the defaults above.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Config::default();

        if let Ok(raw) = env::var("TREE_DEGREE") {
            let degree: usize = raw
                .parse()
                .map_err(|_| TreeError::Config(format!("invalid TREE_DEGREE: {raw}")))?;
            if degree < 2 {
                return Err(TreeError::Config(format!(
                    "invalid TREE_DEGREE: {raw} (must be >= 2)"
                )));
            }
            cfg.tree_degree = degree;
        }

        if let Ok(raw) = env::var("LOG_LEVEL") {
            cfg.log_level = raw.parse()?;
        }

        if let Ok(raw) = env::var("STORAGE_PATH") {
            if !raw.is_empty() {
                cfg.storage_path = PathBuf::from(raw);
            }
        }

        Ok(cfg)
    }
}
