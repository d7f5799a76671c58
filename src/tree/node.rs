//! Node model and the slot arena that owns it.
//!
//! Nodes are held in a flat arena and reference each other by slot index:
//! `children` are owning links (a child belongs to exactly one parent slot),
//! `parent` is a non-owning back-reference used only for upward navigation
//! during rebalancing. Merging frees the absorbed slot onto a free list.

use serde_json::Value;

use super::invariants::corrupted;

/// Index of a node slot in the arena.
pub(crate) type NodeId = usize;

/// A single tree vertex.
///
/// `keys` and `values` are parallel; `children` is empty for leaves and
/// holds exactly `keys.len() + 1` entries for internal nodes whenever no
/// operation is in flight. Occupancy bounds are fixed at creation from the
/// tree degree.
#[derive(Debug)]
pub(crate) struct Node {
    pub keys: Vec<i64>,
    pub values: Vec<Value>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub is_leaf: bool,
    pub min_keys: usize,
    pub max_keys: usize,
}

impl Node {
    pub fn leaf(degree: usize) -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            parent: None,
            is_leaf: true,
            min_keys: degree - 1,
            max_keys: 2 * degree - 1,
        }
    }

    pub fn internal(degree: usize) -> Self {
        Self {
            children: Vec::with_capacity(2 * degree),
            is_leaf: false,
            ..Self::leaf(degree)
        }
    }

    /// Current key count.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.max_keys
    }

    /// Whether a key can be lent to a sibling without underflowing.
    pub fn has_spare(&self) -> bool {
        self.len() > self.min_keys
    }
}

/// Slot arena holding every node of one tree.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Releases a slot made unreachable by a merge or root collapse.
    pub fn release(&mut self, id: NodeId) -> Node {
        match self.slots.get_mut(id).and_then(Option::take) {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => corrupted(format_args!("released vacant node slot {id}")),
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.get(id).is_some_and(Option::is_some)
    }

    /// Dereferencing a freed slot means a stale link survived a structural
    /// mutation, which is unrecoverable.
    pub fn node(&self, id: NodeId) -> &Node {
        match self.slots.get(id).and_then(Option::as_ref) {
            Some(node) => node,
            None => corrupted(format_args!("accessed vacant node slot {id}")),
        }
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.slots.get_mut(id).and_then(Option::as_mut) {
            Some(node) => node,
            None => corrupted(format_args!("accessed vacant node slot {id}")),
        }
    }
}
