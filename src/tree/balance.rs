//! Post-deletion rebalancing: borrow from a sibling with spare capacity,
//! or merge with one, then propagate upward through parent links until the
//! occupancy bounds hold again. Merging is the only way height shrinks.

use tracing::debug;

use super::invariants::corrupted;
use super::{NodeId, TreeState};

impl TreeState {
    /// Repairs `id` after it dropped below its minimum occupancy. The root
    /// is exempt from the bound; an emptied internal root collapses into
    /// its sole child instead.
    pub(crate) fn rebalance(&mut self, id: NodeId) {
        let (parent, len, min_keys, is_leaf, has_children) = {
            let node = self.arena.node(id);
            (
                node.parent,
                node.len(),
                node.min_keys,
                node.is_leaf,
                !node.children.is_empty(),
            )
        };
        let Some(parent_id) = parent else {
            if len == 0 && !is_leaf && has_children {
                self.collapse_root(id);
            }
            return;
        };
        if len >= min_keys {
            return;
        }

        let child_index = self.position_in_parent(parent_id, id);

        if child_index > 0 {
            let left = self.arena.node(parent_id).children[child_index - 1];
            if self.arena.node(left).has_spare() {
                self.borrow_from_left(parent_id, child_index);
                return;
            }
        }

        if child_index + 1 < self.arena.node(parent_id).children.len() {
            let right = self.arena.node(parent_id).children[child_index + 1];
            if self.arena.node(right).has_spare() {
                self.borrow_from_right(parent_id, child_index);
                return;
            }
        }

        // Neither sibling can spare an entry: merge, preferring the left.
        if child_index > 0 {
            self.merge_children(parent_id, child_index - 1);
        } else {
            self.merge_children(parent_id, child_index);
        }

        // The merge pulled a separator out of the parent; keep walking up.
        // A collapsed root was already released and needs no repair.
        if self.arena.contains(parent_id) {
            let parent = self.arena.node(parent_id);
            if parent.len() < parent.min_keys {
                self.rebalance(parent_id);
            }
        }
    }

    /// Rotates one entry through the parent: the separator comes down to
    /// the front of `children[index]`, the left sibling's last entry goes
    /// up as the new separator, and (for internal nodes) the sibling's
    /// last child moves across.
    fn borrow_from_left(&mut self, parent_id: NodeId, index: usize) {
        if index == 0 || index >= self.arena.node(parent_id).children.len() {
            corrupted(format_args!(
                "borrow from left sibling at child index {index} of node {parent_id}"
            ));
        }
        let node_id = self.arena.node(parent_id).children[index];
        let left_id = self.arena.node(parent_id).children[index - 1];

        let (borrowed_key, borrowed_value, borrowed_child) = {
            let left = self.arena.node_mut(left_id);
            debug!(keys = ?left.keys, "borrow_from_left");
            let key = match left.keys.pop() {
                Some(k) => k,
                None => corrupted(format_args!("borrowing from empty sibling {left_id}")),
            };
            let value = match left.values.pop() {
                Some(v) => v,
                None => corrupted(format_args!("sibling {left_id} keys and values diverge")),
            };
            let child = if left.is_leaf {
                None
            } else {
                left.children.pop()
            };
            (key, value, child)
        };

        let (sep_key, sep_value) = {
            let parent = self.arena.node_mut(parent_id);
            (
                std::mem::replace(&mut parent.keys[index - 1], borrowed_key),
                std::mem::replace(&mut parent.values[index - 1], borrowed_value),
            )
        };

        {
            let node = self.arena.node_mut(node_id);
            node.keys.insert(0, sep_key);
            node.values.insert(0, sep_value);
            if let Some(child) = borrowed_child {
                node.children.insert(0, child);
            }
        }
        if let Some(child) = borrowed_child {
            self.arena.node_mut(child).parent = Some(node_id);
        }

        self.debug_check_shape(parent_id);
    }

    /// Mirror image of [`borrow_from_left`](Self::borrow_from_left), using
    /// the right sibling's first entry and child.
    fn borrow_from_right(&mut self, parent_id: NodeId, index: usize) {
        if index >= self.arena.node(parent_id).len() {
            corrupted(format_args!(
                "borrow from right sibling at child index {index} of node {parent_id}"
            ));
        }
        let node_id = self.arena.node(parent_id).children[index];
        let right_id = self.arena.node(parent_id).children[index + 1];

        let (borrowed_key, borrowed_value, borrowed_child) = {
            let right = self.arena.node_mut(right_id);
            if right.keys.is_empty() {
                corrupted(format_args!("borrowing from empty sibling {right_id}"));
            }
            let key = right.keys.remove(0);
            let value = right.values.remove(0);
            let child = if right.is_leaf {
                None
            } else {
                Some(right.children.remove(0))
            };
            (key, value, child)
        };

        let (sep_key, sep_value) = {
            let parent = self.arena.node_mut(parent_id);
            (
                std::mem::replace(&mut parent.keys[index], borrowed_key),
                std::mem::replace(&mut parent.values[index], borrowed_value),
            )
        };

        {
            let node = self.arena.node_mut(node_id);
            node.keys.push(sep_key);
            node.values.push(sep_value);
            if let Some(child) = borrowed_child {
                node.children.push(child);
            }
        }
        if let Some(child) = borrowed_child {
            self.arena.node_mut(child).parent = Some(node_id);
        }

        self.debug_check_shape(parent_id);
    }

    /// Folds `children[index]`, the separator at `index`, and
    /// `children[index + 1]` into a single node. Returns the surviving
    /// node. Collapses the root when the separator was its last key.
    pub(crate) fn merge_children(&mut self, id: NodeId, index: usize) -> NodeId {
        let child_count = self.arena.node(id).children.len();
        if child_count < 2 || index >= child_count - 1 {
            corrupted(format_args!(
                "merging children at index {index} of node {id} with {child_count} children"
            ));
        }

        let (sep_key, sep_value, right_id) = {
            let node = self.arena.node_mut(id);
            debug!(index, keys = ?node.keys, "merge_children");
            let sep_key = node.keys.remove(index);
            let sep_value = node.values.remove(index);
            let right_id = node.children.remove(index + 1);
            (sep_key, sep_value, right_id)
        };
        let left_id = self.arena.node(id).children[index];

        self.absorb(left_id, sep_key, sep_value, right_id);
        self.assert_child_count(id);

        let (len, parent) = {
            let node = self.arena.node(id);
            (node.len(), node.parent)
        };
        if len == 0 && parent.is_none() {
            self.collapse_root(id);
        }
        left_id
    }

    /// Moves the separator and everything owned by `right_id` into
    /// `left_id`, re-parenting transferred children, then frees the
    /// absorbed slot.
    fn absorb(&mut self, left_id: NodeId, sep_key: i64, sep_value: serde_json::Value, right_id: NodeId) {
        let right = self.arena.release(right_id);
        let moved_children = right.children.clone();

        let left = self.arena.node_mut(left_id);
        left.keys.push(sep_key);
        left.values.push(sep_value);
        left.keys.extend(right.keys);
        left.values.extend(right.values);
        if !left.is_leaf {
            left.children.extend(right.children);
        }

        for child in moved_children {
            self.arena.node_mut(child).parent = Some(left_id);
        }
    }

    fn assert_child_count(&self, id: NodeId) {
        let node = self.arena.node(id);
        if !node.is_leaf && node.children.len() != node.len() + 1 {
            corrupted(format_args!(
                "node {id} holds {} keys but {} children after merge",
                node.len(),
                node.children.len()
            ));
        }
    }
}
