//! Error types for delta construction

use sigprop_tree::{Fingerprint, NodeId, TreeError};

/// Errors building or validating a [`SignatureDelta`](crate::SignatureDelta)
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// Target is not a well-formed declaration
    #[error("invalid target {target}: {source}")]
    InvalidTarget {
        /// Target node
        target: NodeId,
        /// Underlying shape error
        #[source]
        source: TreeError,
    },

    /// Old index out of range of the old list
    #[error("{what} #{position} maps to old index {old_index}, but only {len} existed")]
    IndexOutOfRange {
        /// `parameter` or `exception`
        what: &'static str,
        /// Position in the new list
        position: usize,
        /// Requested old index
        old_index: usize,
        /// Old list length
        len: usize,
    },

    /// Two new entries map to the same old position
    #[error("{what} old index {old_index} is used more than once")]
    DuplicateIndex {
        /// `parameter` or `exception`
        what: &'static str,
        /// Duplicated old index
        old_index: usize,
    },

    /// Operation not meaningful for the target
    #[error("invalid operation '{operation}' for target {target}")]
    InvalidOperation {
        /// What was attempted
        operation: String,
        /// Target node
        target: NodeId,
    },

    /// Declaration changed since the delta was built
    #[error("declaration changed since delta was built: expected {expected}, got {actual}")]
    BaseMismatch {
        /// Fingerprint captured at build time
        expected: Fingerprint,
        /// Current fingerprint
        actual: Fingerprint,
    },
}
