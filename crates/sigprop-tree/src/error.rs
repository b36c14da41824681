//! Error types for tree edits

use crate::node::{NodeId, NodeKind};

/// Structural edit refused by the tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Target node (or one of its ancestors) is not writable
    #[error("node {0} is read-only")]
    ReadOnly(NodeId),

    /// Handle does not belong to this tree
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Insertion index past the end of the child list
    #[error("index {index} out of range for {parent} with {len} children")]
    IndexOutOfRange {
        /// Parent node
        parent: NodeId,
        /// Requested index
        index: usize,
        /// Current child count
        len: usize,
    },

    /// Inserting the node would make it its own ancestor
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle {
        /// Intended parent
        parent: NodeId,
        /// Node being inserted
        child: NodeId,
    },

    /// Node does not have the expected shape
    #[error("malformed {kind:?} node {node}: {reason}")]
    Malformed {
        /// Offending node
        node: NodeId,
        /// Its kind
        kind: NodeKind,
        /// What was missing
        reason: String,
    },
}

impl TreeError {
    /// Create malformed-shape error
    #[inline]
    pub fn malformed(node: NodeId, kind: NodeKind, reason: impl Into<String>) -> Self {
        Self::Malformed {
            node,
            kind,
            reason: reason.into(),
        }
    }

    /// Check if the error came from a write-protected region
    #[inline]
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly(_))
    }
}
