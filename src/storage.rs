//! Snapshot persistence.
//!
//! The whole tree is serialized as one JSON document: `root` (a nested
//! node record, `null` for an empty tree), `degree`, `size`, `height`.
//! Node records carry `keys`, `children`, `isLeaf`, `size`, `maxKeys`,
//! `minKeys`, `values`. There is no schema version field; format changes
//! are not backward-compatible.
//!
//! Neither the comparator nor parent back-references are persisted:
//! [`Storage::load`] reinstalls the default ascending comparator (callers
//! re-supply a custom one via [`Tree::set_comparator`]) and rebuilds every
//! parent link in the single top-down reconstruction pass.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, TreeError};
use crate::tree::{default_comparator, Node, NodeId, Tree, TreeState};

/// Persistent storage for one tree, bound to a snapshot path.
pub struct Storage {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct TreeSnapshot {
    root: Option<NodeSnapshot>,
    degree: usize,
    size: usize,
    height: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeSnapshot {
    keys: Vec<i64>,
    children: Vec<NodeSnapshot>,
    #[serde(rename = "isLeaf")]
    is_leaf: bool,
    size: usize,
    #[serde(rename = "maxKeys")]
    max_keys: usize,
    #[serde(rename = "minKeys")]
    min_keys: usize,
    values: Vec<Value>,
}

impl Storage {
    /// Binds storage to the given snapshot file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location snapshots are written to and read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the tree and writes it to the snapshot path, creating
    /// missing parent directories.
    ///
    /// The tree's shared lock is held for the entire call, so the
    /// serialized state is a consistent point-in-time image; concurrent
    /// readers proceed, writers wait.
    pub fn save(&self, tree: &Tree) -> Result<()> {
        let state = tree.read_state();
        let snapshot = capture(&state);
        let data = serde_json::to_vec(&snapshot)
            .map_err(|e| TreeError::Serialization(e.to_string()))?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(&self.path, data)?;
        drop(state);

        info!(path = %self.path.display(), "tree saved");
        Ok(())
    }

    /// Reads the snapshot back into a tree.
    ///
    /// A missing file and undecodable content are distinct errors, so
    /// callers can fall back to a fresh tree on the former without
    /// papering over the latter.
    pub fn load(&self) -> Result<Tree> {
        let data = fs::read(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                TreeError::SnapshotMissing(self.path.clone())
            } else {
                TreeError::Io(e)
            }
        })?;
        let snapshot: TreeSnapshot = serde_json::from_slice(&data)
            .map_err(|e| TreeError::MalformedSnapshot(e.to_string()))?;
        let tree = restore(snapshot)?;
        info!(path = %self.path.display(), "tree loaded");
        Ok(tree)
    }

    /// Removes the snapshot file; a file that never existed is a no-op.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn capture(state: &TreeState) -> TreeSnapshot {
    TreeSnapshot {
        root: state.root.map(|root| capture_node(state, root)),
        degree: state.degree,
        size: state.size,
        height: state.height,
    }
}

fn capture_node(state: &TreeState, id: NodeId) -> NodeSnapshot {
    let node = state.arena.node(id);
    NodeSnapshot {
        keys: node.keys.clone(),
        children: node
            .children
            .iter()
            .map(|&child| capture_node(state, child))
            .collect(),
        is_leaf: node.is_leaf,
        size: node.len(),
        max_keys: node.max_keys,
        min_keys: node.min_keys,
        values: node.values.clone(),
    }
}

fn restore(snapshot: TreeSnapshot) -> Result<Tree> {
    if snapshot.degree < 2 {
        return Err(TreeError::MalformedSnapshot(format!(
            "degree {} is below the minimum of 2",
            snapshot.degree
        )));
    }

    let mut state = TreeState::new(snapshot.degree, default_comparator());
    if let Some(root) = snapshot.root {
        let root_id = restore_node(&mut state, root, None)?;
        state.root = Some(root_id);
    }
    state.size = snapshot.size;
    state.height = snapshot.height;
    debug!(
        degree = state.degree,
        size = state.size,
        height = state.height,
        "snapshot restored"
    );
    Ok(Tree::from_state(state))
}

/// Rebuilds one node and its subtree, wiring the parent back-reference of
/// every child as it goes — the snapshot does not carry them.
fn restore_node(
    state: &mut TreeState,
    snapshot: NodeSnapshot,
    parent: Option<NodeId>,
) -> Result<NodeId> {
    if snapshot.keys.len() != snapshot.values.len() {
        return Err(TreeError::MalformedSnapshot(format!(
            "node holds {} keys but {} values",
            snapshot.keys.len(),
            snapshot.values.len()
        )));
    }
    if snapshot.is_leaf != snapshot.children.is_empty() {
        return Err(TreeError::MalformedSnapshot(
            "leaf flag contradicts child records".into(),
        ));
    }

    let mut node = if snapshot.is_leaf {
        Node::leaf(state.degree)
    } else {
        Node::internal(state.degree)
    };
    node.keys = snapshot.keys;
    node.values = snapshot.values;
    node.parent = parent;
    let id = state.arena.alloc(node);

    for child in snapshot.children {
        let child_id = restore_node(state, child, Some(id))?;
        state.arena.node_mut(id).children.push(child_id);
    }
    Ok(id)
}
