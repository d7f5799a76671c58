//! Human-readable structure dumps for the CLI and debugging.

use std::fmt;
use std::fmt::Write as _;

use tracing::info;

use super::{NodeId, Tree, TreeState};

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Tree")
            .field("degree", &state.degree)
            .field("size", &state.size)
            .field("height", &state.height)
            .finish()
    }
}

impl Tree {
    /// Logs the tree level by level, one line per node.
    pub fn print_structure(&self) {
        let state = self.state.read();
        let Some(root) = state.root else {
            info!("tree is empty");
            return;
        };

        let mut queue = vec![root];
        let mut level = 0;
        while !queue.is_empty() {
            let mut next = Vec::new();
            for id in queue {
                let node = state.arena.node(id);
                info!("level {level}: {:?}", node.keys);
                if !node.is_leaf {
                    next.extend_from_slice(&node.children);
                }
            }
            queue = next;
            level += 1;
        }
    }

    /// Pre-order dump of the whole structure, headed by the tree's
    /// degree, size and height.
    pub fn to_display_string(&self) -> String {
        let state = self.state.read();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Tree (degree={}, size={}, height={}):",
            state.degree, state.size, state.height
        );
        if let Some(root) = state.root {
            write_node(&state, root, 0, &mut out);
        }
        out
    }
}

fn write_node(state: &TreeState, id: NodeId, level: usize, out: &mut String) {
    let node = state.arena.node(id);
    let _ = writeln!(out, "Level {level}: {:?}", node.keys);
    for &child in &node.children {
        write_node(state, child, level + 1, out);
    }
}
