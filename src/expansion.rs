//! Open/closed state of tree nodes across rebuilds.
//!
//! Every parse produces a brand new tree, so expansion is carried over by
//! [`Path`] rather than by node: capture the open paths of the old tree,
//! rebuild, then reopen whatever still exists in the new one.

use std::collections::HashSet;

use crate::path::Path;
use crate::tree::find_mut;
use crate::types::TreeNode;

pub type ExpansionSet = HashSet<Path>;

pub fn capture(root: &TreeNode) -> ExpansionSet {
    let mut expanded = ExpansionSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.expanded {
            expanded.insert(node.path.clone());
        }
        stack.extend(node.children.iter());
    }
    expanded
}

pub fn restore(root: &mut TreeNode, expanded: &ExpansionSet) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        node.expanded = expanded.contains(&node.path);
        stack.extend(node.children.iter_mut());
    }
}

pub fn expand_all(root: &mut TreeNode) {
    set_all(root, true);
}

pub fn collapse_all(root: &mut TreeNode) {
    set_all(root, false);
}

fn set_all(root: &mut TreeNode, expanded: bool) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        node.expanded = expanded && node.is_container();
        stack.extend(node.children.iter_mut());
    }
}

/// Opens or closes a single node. Returns false when nothing lives at `path`.
pub fn set_expanded(root: &mut TreeNode, path: &Path, expanded: bool) -> bool {
    match find_mut(root, path) {
        Some(node) => {
            node.expanded = expanded;
            true
        }
        None => false,
    }
}
