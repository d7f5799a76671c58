//! Ordered key-value index on a self-balancing multi-way search tree.
//!
//! Keys and values live at internal nodes as well as leaves. Search,
//! insertion and deletion run in logarithmic time under strict structural
//! bounds; a single tree-wide reader/writer lock makes every public
//! operation safe under concurrent access. The whole structure lives in
//! memory and persists as an opaque JSON snapshot.

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod tree;

pub use config::{Config, LogLevel};
pub use error::{Result, TreeError};
pub use logging::init_logging;
pub use storage::Storage;
pub use tree::{KeyComparator, Tree, ValidationReport};
