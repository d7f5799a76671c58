//! Crate-wide error type.
//!
//! Only caller and environment failures surface here: I/O, snapshot
//! decoding, configuration, and bad construction parameters. Structural
//! invariant violations inside the tree are programming bugs and abort the
//! process instead of returning an error (see [`crate::tree`]).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Recoverable errors reported to callers.
///
/// A key that is absent on search or delete is a normal negative result,
/// not an error, and never appears here.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Underlying filesystem failure while reading or writing a snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The tree could not be encoded into the snapshot document.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// No snapshot exists at the configured path.
    #[error("snapshot not found: {}", .0.display())]
    SnapshotMissing(PathBuf),
    /// The snapshot file exists but could not be decoded.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    /// A caller-supplied parameter is out of contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// An environment configuration value is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
