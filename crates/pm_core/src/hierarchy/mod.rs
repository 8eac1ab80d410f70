//! Parent-pointer hierarchies: forest reconstruction and ancestor walks.
//!
//! # Responsibility
//! - Rebuild a rooted forest from flat rows with nullable parent ids.
//! - Resolve the root-first ancestor chain of one node.
//!
//! # Invariants
//! - Every input node appears exactly once in a built forest.
//! - Dangling parent references are tolerated (logged), never raised.
//! - Cycles are reported as [`HierarchyError::CycleDetected`] instead of looping.
//!
//! Used identically by organisation units and categories.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;

mod ancestry;
mod tree;

pub use ancestry::resolve_ancestry;
pub use tree::{build_tree, flatten, Forest, TreeNode};

/// A row that participates in a parent-pointer hierarchy.
pub trait HierarchyNode {
    type Id: Copy + Eq + Hash + Display + Debug;

    fn node_id(&self) -> Self::Id;
    fn parent_id(&self) -> Option<Self::Id>;
}

/// Errors raised while building or walking a hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError<Id> {
    /// Starting node of an ancestry walk does not exist.
    NodeNotFound(Id),
    /// Two input rows share one id.
    DuplicateNode(Id),
    /// Parent chain revisits this node.
    CycleDetected(Id),
}

impl<Id: Display> Display for HierarchyError<Id> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "hierarchy node not found: {id}"),
            Self::DuplicateNode(id) => write!(f, "hierarchy node listed twice: {id}"),
            Self::CycleDetected(id) => write!(f, "parent cycle detected at node {id}"),
        }
    }
}

impl<Id: Display + Debug> Error for HierarchyError<Id> {}
