//! The B-tree engine.
//!
//! Keys and values live at every level of the tree, not only at leaves.
//! Insertion splits full nodes preemptively on the way down; deletion
//! removes first and rebalances afterwards, walking parent links upward.
//! A single tree-wide reader/writer lock serializes mutations against
//! everything else; lookups share it.
//!
//! Duplicate keys are accepted: a second insert of an existing key adds a
//! new entry at the scan position instead of replacing or rejecting it.

mod balance;
mod delete;
mod display;
mod insert;
mod invariants;
mod node;

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TreeError};

pub use invariants::ValidationReport;
pub(crate) use node::{Node, NodeArena, NodeId};

/// Total order over keys. Must be a strict weak ordering; anything less
/// yields undefined structural corruption, not a checked error.
pub type KeyComparator = Arc<dyn Fn(&i64, &i64) -> Ordering + Send + Sync>;

pub(crate) fn default_comparator() -> KeyComparator {
    Arc::new(|a, b| a.cmp(b))
}

/// Whole-tree state guarded by the public lock.
pub(crate) struct TreeState {
    pub arena: NodeArena,
    pub root: Option<NodeId>,
    pub degree: usize,
    pub size: usize,
    pub height: usize,
    pub comparator: KeyComparator,
}

impl TreeState {
    pub(crate) fn new(degree: usize, comparator: KeyComparator) -> Self {
        Self {
            arena: NodeArena::new(),
            root: None,
            degree,
            size: 0,
            height: 0,
            comparator,
        }
    }

    pub(crate) fn cmp(&self, a: &i64, b: &i64) -> Ordering {
        (self.comparator)(a, b)
    }

    /// First position in `id` whose key is >= `key`, plus an exact-match
    /// flag. Search and deletion scan this way.
    fn scan_index(&self, id: NodeId, key: i64) -> (usize, bool) {
        let node = self.arena.node(id);
        let mut i = 0;
        while i < node.len() && self.cmp(&node.keys[i], &key) == Ordering::Less {
            i += 1;
        }
        let found = i < node.len() && self.cmp(&node.keys[i], &key) == Ordering::Equal;
        (i, found)
    }

    /// Slot a key descends into on insertion: one past the last key <=
    /// `key`, so duplicates route right of equal separators.
    fn descent_slot(&self, id: NodeId, key: i64) -> usize {
        let node = self.arena.node(id);
        let mut i = node.len();
        while i > 0 && self.cmp(&node.keys[i - 1], &key) == Ordering::Greater {
            i -= 1;
        }
        i
    }

    fn search_node(&self, id: NodeId, key: i64) -> Option<Value> {
        let (i, found) = self.scan_index(id, key);
        let node = self.arena.node(id);
        if found {
            return Some(node.values[i].clone());
        }
        if node.is_leaf {
            return None;
        }
        self.search_node(node.children[i], key)
    }
}

/// A concurrent ordered key-value index.
///
/// Every public operation acquires the internal lock exactly once:
/// exclusively for [`insert`](Tree::insert) and [`delete`](Tree::delete),
/// shared for everything else. Operations run to completion while the
/// lock is held; there is no timeout or cancellation.
pub struct Tree {
    pub(crate) state: RwLock<TreeState>,
}

impl Tree {
    /// Creates an empty tree with the given minimum degree and the default
    /// ascending comparator.
    ///
    /// Degrees below 2 cannot satisfy the occupancy bounds and are
    /// rejected.
    pub fn new(degree: usize) -> Result<Self> {
        Self::with_comparator(degree, default_comparator())
    }

    /// Creates an empty tree with a caller-supplied key comparator.
    pub fn with_comparator(degree: usize, comparator: KeyComparator) -> Result<Self> {
        if degree < 2 {
            return Err(TreeError::InvalidArgument(format!(
                "degree must be at least 2, got {degree}"
            )));
        }
        Ok(Self {
            state: RwLock::new(TreeState::new(degree, comparator)),
        })
    }

    pub(crate) fn from_state(state: TreeState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Shared-mode access for collaborators that must hold the lock across
    /// a whole compound read (snapshot serialization does).
    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, TreeState> {
        self.state.read()
    }

    /// Replaces the comparator, e.g. after loading a snapshot that could
    /// not persist it. The caller is responsible for supplying an order
    /// consistent with the keys already in the tree.
    pub fn set_comparator(&self, comparator: KeyComparator) {
        self.state.write().comparator = comparator;
    }

    /// Inserts `key` with an associated value.
    ///
    /// Duplicates are inserted as new entries, never rejected or merged.
    pub fn insert(&self, key: i64, value: Value) {
        let mut state = self.state.write();
        state.insert(key, value);
    }

    /// Looks up `key` and returns its value, or `None` when absent.
    ///
    /// With duplicates present, returns the first match on the descent
    /// path.
    pub fn search(&self, key: i64) -> Option<Value> {
        let state = self.state.read();
        let root = state.root?;
        state.search_node(root, key)
    }

    /// Removes one entry for `key` if present; an absent key is a silent
    /// no-op. Returns whether an entry was removed.
    pub fn delete(&self, key: i64) -> bool {
        let mut state = self.state.write();
        let removed = state.delete(key);
        if !removed {
            debug!(key, "delete: key not present");
        }
        removed
    }

    /// Total number of entries across the whole tree.
    pub fn len(&self) -> usize {
        self.state.read().size
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root-to-leaf level count; 0 when the tree is empty.
    pub fn height(&self) -> usize {
        self.state.read().height
    }

    /// Minimum degree fixed at construction.
    pub fn degree(&self) -> usize {
        self.state.read().degree
    }

    /// Non-fatal structural validation for operators and tests.
    ///
    /// Unlike the internal assertions, a violation here is reported, not
    /// fatal.
    pub fn validate(&self) -> ValidationReport {
        let state = self.state.read();
        state.validate_report()
    }
}
