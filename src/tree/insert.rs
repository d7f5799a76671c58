//! Insertion engine: top-down preemptive splitting.
//!
//! Every node entered during descent is guaranteed to have room for one
//! more key before we recurse into it — a full child is split first, and a
//! full root is split under a fresh root before the descent even starts.
//! Splitting is the only way height grows.

use serde_json::Value;
use tracing::debug;

use super::{Node, NodeId, TreeState};

impl TreeState {
    pub(crate) fn insert(&mut self, key: i64, value: Value) {
        let Some(root_id) = self.root else {
            let mut root = Node::leaf(self.degree);
            root.keys.push(key);
            root.values.push(value);
            self.root = Some(self.arena.alloc(root));
            self.size = 1;
            self.height = 1;
            debug!(key, "insert: created root leaf");
            return;
        };

        self.debug_check_shape(root_id);

        let mut root_id = root_id;
        if self.arena.node(root_id).is_full() {
            let mut new_root = Node::internal(self.degree);
            new_root.children.push(root_id);
            let new_root_id = self.arena.alloc(new_root);
            self.arena.node_mut(root_id).parent = Some(new_root_id);
            self.split_child(new_root_id, 0);
            self.root = Some(new_root_id);
            self.height += 1;
            root_id = new_root_id;
            debug!(height = self.height, "insert: split full root");
        }

        self.insert_non_full(root_id, key, value);
        self.size += 1;

        self.debug_check_shape(root_id);
    }

    fn insert_non_full(&mut self, id: NodeId, key: i64, value: Value) {
        if self.arena.node(id).is_leaf {
            let pos = self.descent_slot(id, key);
            let node = self.arena.node_mut(id);
            node.keys.insert(pos, key);
            node.values.insert(pos, value);
            return;
        }

        let mut slot = self.descent_slot(id, key);
        let child_id = self.arena.node(id).children[slot];
        if self.arena.node(child_id).is_full() {
            self.split_child(id, slot);
            // The promoted median may shift which child covers the key.
            if self.cmp(&self.arena.node(id).keys[slot], &key) == std::cmp::Ordering::Less {
                slot += 1;
            }
        }
        let child_id = self.arena.node(id).children[slot];
        self.insert_non_full(child_id, key, value);
    }

    /// Splits the full child at `parent.children[index]`.
    ///
    /// The median key/value moves up into the parent at `index`; the upper
    /// `t - 1` keys (and upper `t` children, re-parented) move into a new
    /// sibling spliced in right after the original child.
    pub(crate) fn split_child(&mut self, parent_id: NodeId, index: usize) {
        let t = self.degree;
        let child_id = self.arena.node(parent_id).children[index];

        self.debug_check_shape(child_id);

        let (median_key, median_value, sibling) = {
            let child = self.arena.node_mut(child_id);
            debug!(index, keys = ?child.keys, "split_child");
            let upper_keys = child.keys.split_off(t);
            let upper_values = child.values.split_off(t);
            let median_key = child.keys.remove(t - 1);
            let median_value = child.values.remove(t - 1);
            let upper_children = if child.is_leaf {
                Vec::new()
            } else {
                child.children.split_off(t)
            };
            let mut sibling = if child.is_leaf {
                Node::leaf(t)
            } else {
                Node::internal(t)
            };
            sibling.keys = upper_keys;
            sibling.values = upper_values;
            sibling.children = upper_children;
            sibling.parent = Some(parent_id);
            (median_key, median_value, sibling)
        };

        let sibling_id = self.arena.alloc(sibling);
        let moved: Vec<NodeId> = self.arena.node(sibling_id).children.clone();
        for grandchild in moved {
            self.arena.node_mut(grandchild).parent = Some(sibling_id);
        }

        let parent = self.arena.node_mut(parent_id);
        parent.keys.insert(index, median_key);
        parent.values.insert(index, median_value);
        parent.children.insert(index + 1, sibling_id);

        self.debug_check_shape(child_id);
        self.debug_check_shape(sibling_id);
        self.debug_check_shape(parent_id);
    }
}
