//! Run outcomes

use crate::conflict::ConflictReport;
use sigprop_tree::NodeId;

/// Site edited with an unresolved argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedSite {
    /// Call node
    pub site: NodeId,

    /// What the user has to finish by hand
    pub reason: String,
}

/// Result of a completed apply phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Usages rewritten
    pub applied_usages: usize,

    /// Usage sites left untouched because of their conflicts
    pub skipped: Vec<NodeId>,

    /// Sites edited but needing attention (ambiguous or missing defaults)
    pub flagged: Vec<FlaggedSite>,

    /// Conflicts confirmed or skipped during the run
    pub report: ConflictReport,

    /// Tree edits committed
    pub edits: usize,
}

impl ApplySummary {
    /// Summary of a run that had nothing to do
    #[inline]
    #[must_use]
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Whether the run did not touch the tree
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.edits == 0
    }
}

/// Outcome of [`Engine::run`](crate::Engine::run)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Changes were committed
    Applied(ApplySummary),

    /// Nothing was changed because of these conflicts
    Conflicts(ConflictReport),

    /// The hook or a usage limit stopped the run before any edit
    Aborted(String),
}

impl RunOutcome {
    /// Whether the change was applied
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Apply summary, if applied
    #[must_use]
    pub fn applied(&self) -> Option<&ApplySummary> {
        match self {
            Self::Applied(summary) => Some(summary),
            _ => None,
        }
    }

    /// Conflict report, if stopped by conflicts
    #[must_use]
    pub fn conflicts(&self) -> Option<&ConflictReport> {
        match self {
            Self::Conflicts(report) => Some(report),
            _ => None,
        }
    }
}
