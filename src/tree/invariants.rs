//! Structural well-formedness checks.
//!
//! Two tiers. The fatal tier ([`corrupted`], [`debug_check_shape`]) fires
//! on conditions that can only mean the engine itself is broken; it logs
//! full context and aborts rather than handing a corrupt structure back to
//! the caller. The query tier ([`TreeState::validate_report`]) is for
//! operators and tests: it walks the whole tree and reports every
//! violation without crashing anything.
//!
//! [`debug_check_shape`]: TreeState::debug_check_shape

use std::cmp::Ordering;
use std::fmt;

use tracing::error;

use super::{NodeId, TreeState};

/// Terminal handler for invariant violations. These are never converted
/// into error values: a broken shape means the library is buggy, not that
/// the caller misused it.
pub(crate) fn corrupted(args: fmt::Arguments<'_>) -> ! {
    let msg = args.to_string();
    error!("structural invariant violated: {msg}");
    panic!("structural invariant violated: {msg}");
}

/// Outcome of a non-fatal validation pass.
///
/// Empty means the tree satisfies every structural invariant; otherwise
/// each entry describes one violation.
#[derive(Debug, Default)]
pub struct ValidationReport {
    violations: Vec<String>,
}

impl ValidationReport {
    /// Whether no violations were found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable description of each violation found.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    fn push(&mut self, violation: String) {
        self.violations.push(violation);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return f.write_str("tree is valid");
        }
        writeln!(f, "{} violation(s):", self.violations.len())?;
        for violation in &self.violations {
            writeln!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

impl TreeState {
    /// Recursive shape assertion used as a checkpoint after structural
    /// mutations. Compiled out of release builds; the always-on local
    /// checks in the mutation paths cover the fatal cases there.
    #[cfg(debug_assertions)]
    pub(crate) fn debug_check_shape(&self, id: NodeId) {
        let node = self.arena.node(id);
        if node.is_leaf {
            return;
        }
        if node.children.len() != node.len() + 1 {
            corrupted(format_args!(
                "node {id} ({:?}) holds {} keys but {} children, expected {}",
                node.keys,
                node.len(),
                node.children.len(),
                node.len() + 1
            ));
        }
        for &child in &node.children {
            self.debug_check_shape(child);
        }
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn debug_check_shape(&self, _id: NodeId) {}

    /// Full structural validation: shape, occupancy, ordering, separator
    /// bounds, parent consistency, uniform leaf depth, size accounting.
    pub(crate) fn validate_report(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let Some(root) = self.root else {
            if self.size != 0 {
                report.push(format!("empty tree reports size {}", self.size));
            }
            if self.height != 0 {
                report.push(format!("empty tree reports height {}", self.height));
            }
            return report;
        };

        let mut key_total = 0usize;
        let mut leaf_depths = Vec::new();
        self.validate_node(
            root,
            true,
            1,
            None,
            None,
            &mut key_total,
            &mut leaf_depths,
            &mut report,
        );

        if key_total != self.size {
            report.push(format!(
                "tree size {} does not match {} keys actually stored",
                self.size, key_total
            ));
        }
        if let Some(&first) = leaf_depths.first() {
            if leaf_depths.iter().any(|&d| d != first) {
                report.push("leaves are not all at the same depth".into());
            } else if first != self.height {
                report.push(format!(
                    "tree height {} does not match leaf depth {first}",
                    self.height
                ));
            }
        }
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn validate_node(
        &self,
        id: NodeId,
        is_root: bool,
        depth: usize,
        lower: Option<i64>,
        upper: Option<i64>,
        key_total: &mut usize,
        leaf_depths: &mut Vec<usize>,
        report: &mut ValidationReport,
    ) {
        let node = self.arena.node(id);
        *key_total += node.len();

        if !is_root && (node.len() < node.min_keys || node.len() > node.max_keys) {
            report.push(format!(
                "node {id} holds {} keys, outside [{}, {}]",
                node.len(),
                node.min_keys,
                node.max_keys
            ));
        }
        if is_root && node.len() > node.max_keys {
            report.push(format!(
                "root holds {} keys, above the maximum {}",
                node.len(),
                node.max_keys
            ));
        }
        if is_root && node.len() == 0 {
            // An emptied root is collapsed or released before the
            // operation returns; a persisting empty root is a defect.
            report.push("root node holds no keys".into());
        }
        if node.keys.len() != node.values.len() {
            report.push(format!(
                "node {id} holds {} keys but {} values",
                node.keys.len(),
                node.values.len()
            ));
        }

        // Duplicates are legal, so equal neighbors are accepted; only an
        // actual inversion is a violation.
        for i in 1..node.len() {
            if self.cmp(&node.keys[i - 1], &node.keys[i]) == Ordering::Greater {
                report.push(format!("node {id} keys out of order: {:?}", node.keys));
                break;
            }
        }
        for &key in &node.keys {
            if lower.is_some_and(|bound| self.cmp(&key, &bound) == Ordering::Less)
                || upper.is_some_and(|bound| self.cmp(&key, &bound) == Ordering::Greater)
            {
                report.push(format!(
                    "node {id} key {key} escapes its separator bounds"
                ));
                break;
            }
        }

        if node.is_leaf {
            if !node.children.is_empty() {
                report.push(format!(
                    "leaf {id} holds {} children",
                    node.children.len()
                ));
            }
            leaf_depths.push(depth);
            return;
        }

        if node.children.len() != node.len() + 1 {
            report.push(format!(
                "node {id} holds {} keys but {} children",
                node.len(),
                node.children.len()
            ));
            return;
        }
        for (i, &child) in node.children.iter().enumerate() {
            if !self.arena.contains(child) {
                report.push(format!("node {id} links to freed slot {child}"));
                continue;
            }
            if self.arena.node(child).parent != Some(id) {
                report.push(format!(
                    "child {child} of node {id} carries parent {:?}",
                    self.arena.node(child).parent
                ));
            }
            let child_lower = if i == 0 { lower } else { Some(node.keys[i - 1]) };
            let child_upper = if i == node.len() {
                upper
            } else {
                Some(node.keys[i])
            };
            self.validate_node(
                child,
                false,
                depth + 1,
                child_lower,
                child_upper,
                key_total,
                leaf_depths,
                report,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{default_comparator, Node, TreeState};
    use serde_json::Value;

    fn leaf_with(state: &mut TreeState, keys: &[i64]) -> usize {
        let mut node = Node::leaf(state.degree);
        node.keys = keys.to_vec();
        node.values = keys.iter().map(|&k| Value::from(k)).collect();
        state.arena.alloc(node)
    }

    #[test]
    fn detects_child_count_mismatch() {
        let mut state = TreeState::new(2, default_comparator());
        let left = leaf_with(&mut state, &[1]);
        let right = leaf_with(&mut state, &[9]);
        let mut root = Node::internal(2);
        root.keys = vec![5, 7];
        root.values = vec![Value::from(5), Value::from(7)];
        root.children = vec![left, right];
        let root_id = state.arena.alloc(root);
        state.arena.node_mut(left).parent = Some(root_id);
        state.arena.node_mut(right).parent = Some(root_id);
        state.root = Some(root_id);
        state.size = 4;
        state.height = 2;

        let report = state.validate_report();
        assert!(!report.is_valid());
        assert!(report
            .violations()
            .iter()
            .any(|v| v.contains("children")));
    }

    #[test]
    fn detects_parent_mismatch_and_disorder() {
        let mut state = TreeState::new(2, default_comparator());
        let left = leaf_with(&mut state, &[3, 1]);
        let right = leaf_with(&mut state, &[9]);
        let mut root = Node::internal(2);
        root.keys = vec![5];
        root.values = vec![Value::from(5)];
        root.children = vec![left, right];
        let root_id = state.arena.alloc(root);
        state.arena.node_mut(right).parent = Some(root_id);
        state.root = Some(root_id);
        state.size = 4;
        state.height = 2;

        let report = state.validate_report();
        let joined = report.violations().join("\n");
        assert!(joined.contains("out of order"));
        assert!(joined.contains("parent"));
    }

    #[test]
    fn accepts_duplicate_keys_within_a_node() {
        let mut state = TreeState::new(3, default_comparator());
        let root = leaf_with(&mut state, &[4, 4, 7]);
        state.root = Some(root);
        state.size = 3;
        state.height = 1;
        assert!(state.validate_report().is_valid());
    }
}
