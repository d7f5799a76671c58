//! Deletion engine.
//!
//! Deletion is reactive, the mirror image of insertion's preemptive
//! splits: the descent removes first and the balance pass (see
//! [`balance`](super::balance)) repairs underfull nodes afterwards by
//! walking parent links upward. Intermediate states may dip below the
//! minimum occupancy; none of that is observable once the public call
//! returns.

use serde_json::Value;
use tracing::debug;

use super::invariants::corrupted;
use super::{NodeId, TreeState};

impl TreeState {
    /// Removes one entry for `key`. Returns whether anything was removed;
    /// an absent key leaves the tree untouched.
    pub(crate) fn delete(&mut self, key: i64) -> bool {
        let Some(root_id) = self.root else {
            return false;
        };
        debug!(key, "delete: start");

        let removed = self.delete_from(root_id, key);

        if let Some(root_id) = self.root {
            let (len, is_leaf) = {
                let root = self.arena.node(root_id);
                (root.len(), root.is_leaf)
            };
            if len == 0 {
                if is_leaf {
                    // Last entry gone; the tree is empty again.
                    self.arena.release(root_id);
                    self.root = None;
                    self.height = 0;
                } else {
                    self.collapse_root(root_id);
                }
            }
        }

        if removed {
            self.size -= 1;
        }
        if let Some(root_id) = self.root {
            self.debug_check_shape(root_id);
        }
        debug!(key, removed, "delete: finished");
        removed
    }

    /// An empty internal root hands the tree over to its sole child.
    pub(crate) fn collapse_root(&mut self, root_id: NodeId) {
        let child = self.arena.node(root_id).children[0];
        self.arena.release(root_id);
        self.arena.node_mut(child).parent = None;
        self.root = Some(child);
        self.height -= 1;
        debug!(height = self.height, "delete: collapsed empty root");
    }

    fn delete_from(&mut self, id: NodeId, key: i64) -> bool {
        let (i, found) = self.scan_index(id, key);
        let is_leaf = self.arena.node(id).is_leaf;

        if found {
            if is_leaf {
                let underfull = {
                    let node = self.arena.node_mut(id);
                    debug!(key, keys = ?node.keys, "delete: removing from leaf");
                    node.keys.remove(i);
                    node.values.remove(i);
                    node.len() < node.min_keys
                };
                if underfull {
                    self.rebalance(id);
                }
            } else {
                self.delete_internal(id, i);
            }
            return true;
        }

        if is_leaf {
            return false;
        }
        let child_id = self.arena.node(id).children[i];
        self.delete_from(child_id, key)
    }

    /// Removes `keys[index]` from an internal node. Three cases, first
    /// match wins: borrow the predecessor from a spare left child, borrow
    /// the successor from a spare right child, or fold the separator down
    /// into a merge of the two minimal children and chase the key into the
    /// merged node. The merge costs this node a key, so the balance engine
    /// may need to repair it afterwards, exactly as for a leaf removal.
    fn delete_internal(&mut self, id: NodeId, index: usize) {
        let key = self.arena.node(id).keys[index];
        let left_id = self.arena.node(id).children[index];
        let right_id = self.arena.node(id).children[index + 1];
        debug!(key, index, "delete: internal hit");

        if self.arena.node(left_id).has_spare() {
            let (pred_key, pred_value) = self.rightmost_entry(left_id);
            let node = self.arena.node_mut(id);
            node.keys[index] = pred_key;
            node.values[index] = pred_value;
            self.delete_from(left_id, pred_key);
            return;
        }

        if self.arena.node(right_id).has_spare() {
            let (succ_key, succ_value) = self.leftmost_entry(right_id);
            let node = self.arena.node_mut(id);
            node.keys[index] = succ_key;
            node.values[index] = succ_value;
            self.delete_from(right_id, succ_key);
            return;
        }

        // Both children minimal: the separator has to come down in a
        // merge, and the key is guaranteed to be found in the merged node.
        let merged = self.merge_children(id, index);
        self.delete_from(merged, key);

        // An emptied root was already collapsed by the merge; anything
        // else that dropped below its minimum is repaired reactively.
        if self.arena.contains(id) {
            let node = self.arena.node(id);
            if node.len() < node.min_keys {
                self.rebalance(id);
            }
        }
    }

    /// Predecessor of an internal key: the last entry of the rightmost
    /// leaf under its left child.
    fn rightmost_entry(&self, mut id: NodeId) -> (i64, Value) {
        loop {
            let node = self.arena.node(id);
            if node.is_leaf {
                let last = node.len() - 1;
                return (node.keys[last], node.values[last].clone());
            }
            id = node.children[node.len()];
        }
    }

    /// Successor of an internal key: the first entry of the leftmost leaf
    /// under its right child.
    fn leftmost_entry(&self, mut id: NodeId) -> (i64, Value) {
        loop {
            let node = self.arena.node(id);
            if node.is_leaf {
                return (node.keys[0], node.values[0].clone());
            }
            id = node.children[0];
        }
    }

    /// Index of `child` among `parent`'s children; a miss means the parent
    /// back-reference and the ownership links disagree, which is fatal.
    pub(crate) fn position_in_parent(&self, parent_id: NodeId, child: NodeId) -> usize {
        let parent = self.arena.node(parent_id);
        match parent.children.iter().position(|&c| c == child) {
            Some(i) => i,
            None => corrupted(format_args!(
                "node {child} not among the children of its parent {parent_id}"
            )),
        }
    }
}
