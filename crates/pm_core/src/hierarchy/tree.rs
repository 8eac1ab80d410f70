use super::{HierarchyError, HierarchyNode};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;

/// One node of a built forest with its ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub node: T,
    pub children: Vec<TreeNode<T>>,
}

/// Result of [`build_tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forest<T: HierarchyNode> {
    /// Declared roots and orphaned roots, in input order.
    pub roots: Vec<TreeNode<T>>,
    /// Ids whose `parent_id` did not resolve and were promoted to roots.
    pub orphaned: Vec<T::Id>,
}

/// Rebuilds a forest from flat parent-pointer rows in O(n).
///
/// Nodes are linked by arena index, so sibling order follows input order.
/// A node whose parent id is missing from `nodes` becomes an orphaned root.
///
/// # Errors
/// - [`HierarchyError::DuplicateNode`] when two rows share one id.
/// - [`HierarchyError::CycleDetected`] when some node cannot be reached from
///   any root (its parent chain loops).
pub fn build_tree<T: HierarchyNode>(nodes: Vec<T>) -> Result<Forest<T>, HierarchyError<T::Id>> {
    let mut index: HashMap<T::Id, usize> = HashMap::with_capacity(nodes.len());
    for (slot, node) in nodes.iter().enumerate() {
        if index.insert(node.node_id(), slot).is_some() {
            return Err(HierarchyError::DuplicateNode(node.node_id()));
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut root_slots = Vec::new();
    let mut orphaned = Vec::new();

    for (slot, node) in nodes.iter().enumerate() {
        match node.parent_id() {
            None => root_slots.push(slot),
            Some(parent_id) => match index.get(&parent_id) {
                Some(&parent_slot) => children[parent_slot].push(slot),
                None => {
                    warn!(
                        "event=tree_build module=hierarchy status=orphan node_id={} parent_id={}",
                        node.node_id(),
                        parent_id
                    );
                    orphaned.push(node.node_id());
                    root_slots.push(slot);
                }
            },
        }
    }

    // Pre-order walk from roots; reversed, every child precedes its parent.
    let mut visited = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack: Vec<usize> = root_slots.iter().rev().copied().collect();
    while let Some(slot) = stack.pop() {
        if visited[slot] {
            continue;
        }
        visited[slot] = true;
        order.push(slot);
        stack.extend(children[slot].iter().rev().copied());
    }

    if let Some(unreached) = visited.iter().position(|seen| !seen) {
        return Err(HierarchyError::CycleDetected(nodes[unreached].node_id()));
    }

    let mut pending: Vec<Option<T>> = nodes.into_iter().map(Some).collect();
    let mut built: Vec<Option<TreeNode<T>>> = (0..pending.len()).map(|_| None).collect();
    for &slot in order.iter().rev() {
        let kids = children[slot]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        if let Some(node) = pending[slot].take() {
            built[slot] = Some(TreeNode {
                node,
                children: kids,
            });
        }
    }

    let roots: Vec<TreeNode<T>> = root_slots
        .iter()
        .filter_map(|slot| built[*slot].take())
        .collect();

    debug!(
        "event=tree_build module=hierarchy status=ok roots={} orphans={}",
        roots.len(),
        orphaned.len()
    );

    Ok(Forest { roots, orphaned })
}

/// Depth-first pre-order walk over a forest.
pub fn flatten<T>(roots: &[TreeNode<T>]) -> Vec<&T> {
    let mut out = Vec::new();
    let mut stack: Vec<&TreeNode<T>> = roots.iter().rev().collect();
    while let Some(current) = stack.pop() {
        out.push(&current.node);
        stack.extend(current.children.iter().rev());
    }
    out
}
