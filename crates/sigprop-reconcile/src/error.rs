//! Error types for sequence reconciliation

use sigprop_tree::{NodeId, TreeError};

/// Reconciliation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Tree refused an edit
    #[error("structural edit failed: {0}")]
    Structural(#[from] TreeError),

    /// Same node requested at two desired positions
    #[error("node {0} appears more than once in the desired sequence")]
    DuplicateDesired(NodeId),
}

impl ReconcileError {
    /// Check if the failure came from the tree itself
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }
}
