//! Error types for the propagation engine
//!
//! Provides error handling for:
//! - Structural edits refused by the host tree
//! - Invalid or stale deltas
//! - Configuration loading

use sigprop_delta::DeltaError;
use sigprop_reconcile::ReconcileError;
use sigprop_tree::{Fingerprint, NodeId, TreeError};

/// Main engine error type
///
/// Conflicts and cancellations are not errors; they are reported through
/// [`RunOutcome`](crate::RunOutcome).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Tree refused an edit; the transaction was rolled back
    #[error("structural error: {0}")]
    Structural(#[from] TreeError),

    /// Sequence reconciliation failed; the transaction was rolled back
    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Delta is malformed
    #[error("invalid delta: {0}")]
    Delta(#[from] DeltaError),

    /// Declaration changed since the delta was built
    #[error("delta for {target} is stale: expected {expected}, found {actual}")]
    StaleDelta {
        /// Target declaration
        target: NodeId,
        /// Fingerprint the delta was built against
        expected: Fingerprint,
        /// Current fingerprint
        actual: Fingerprint,
    },

    /// Target cannot be resolved to the delta's declaration
    #[error("invalid target {target}: {reason}")]
    InvalidTarget {
        /// Requested target
        target: NodeId,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Check if the error came from the tree refusing an edit
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Structural(_) | Self::Reconcile(ReconcileError::Structural(_))
        )
    }

    /// Check if retrying with a freshly built delta may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleDelta { .. })
    }

    /// Create invalid target error
    #[inline]
    pub fn invalid_target(target: NodeId, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target,
            reason: reason.into(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Malformed TOML
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// File could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Value out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
