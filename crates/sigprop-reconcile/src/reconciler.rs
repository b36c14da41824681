//! Ordered sequence reconciliation
//!
//! Provides [`SequenceReconciler`], which edits a parent node in place until
//! its children equal a desired sequence. Kept children are moved, never
//! re-created, so anything attached to them survives.

use crate::accessor::ChildrenAccessor;
use crate::error::ReconcileError;
use sigprop_tree::{NodeId, NodeKind, SyntaxTree};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Edit counts of one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Nodes inserted or moved into place
    pub inserted: usize,
    /// Nodes deleted
    pub removed: usize,
    /// Separator slots synthesized
    pub separators: usize,
}

impl ReconcileStats {
    /// Total structural edits
    #[inline]
    #[must_use]
    pub fn edits(&self) -> usize {
        self.inserted + self.removed + self.separators
    }

    /// Check if nothing was edited
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.edits() == 0
    }
}

/// Patches an ordered child sequence to match a desired one
///
/// Desired entries are either existing nodes (reused by identity), new
/// nodes (inserted), or `None` (an empty slot kept as a separator). The
/// removal mask addresses the children as they were before the first edit:
/// a masked original is deleted as soon as a wanted insertion reaches it.
#[derive(Clone, Copy)]
pub struct SequenceReconciler<'a> {
    accessor: &'a dyn ChildrenAccessor,
    removal_mask: &'a [bool],
}

impl<'a> SequenceReconciler<'a> {
    /// Create reconciler over the children produced by `accessor`
    #[inline]
    #[must_use]
    pub fn new(accessor: &'a dyn ChildrenAccessor) -> Self {
        Self {
            accessor,
            removal_mask: &[],
        }
    }

    /// With mask over original positions to force-delete
    #[inline]
    #[must_use]
    pub fn with_removal_mask(mut self, removal_mask: &'a [bool]) -> Self {
        self.removal_mask = removal_mask;
        self
    }

    /// Edit `parent` until its children equal `desired`
    ///
    /// # Errors
    /// Returns error if the tree refuses an edit or a node is desired twice.
    pub fn reconcile(
        &self,
        tree: &mut dyn SyntaxTree,
        parent: NodeId,
        desired: &[Option<NodeId>],
    ) -> Result<ReconcileStats, ReconcileError> {
        let mut seen = HashSet::new();
        if let Some(dup) = desired.iter().flatten().find(|n| !seen.insert(**n)) {
            return Err(ReconcileError::DuplicateDesired(*dup));
        }

        let originals: SmallVec<[NodeId; 8]> = self.accessor.children(tree, parent).into();
        let mut stats = ReconcileStats::default();
        let mut i = 0;

        while i < desired.len() {
            let existing = self.accessor.children(tree, parent);
            let old = existing.get(i).copied();

            match desired[i] {
                Some(new) if Some(new) != old => {
                    if let Some(old) = old.filter(|o| self.is_masked(&originals, *o)) {
                        tree.detach(old)?;
                        stats.removed += 1;
                        // Retry this slot against the next live child.
                        continue;
                    }
                    tree.insert_before(parent, old, new)?;
                    stats.inserted += 1;
                }
                Some(_) => {}
                None => {
                    let reuse = old.is_some_and(|o| tree.kind(o) == NodeKind::Separator);
                    let needed =
                        desired.len() > 1 && (!existing.is_empty() || i + 1 < desired.len());
                    if !reuse && needed {
                        let separator = tree.create(NodeKind::Separator, "");
                        tree.insert_before(parent, old, separator)?;
                        stats.separators += 1;
                    }
                }
            }
            i += 1;
        }

        let trailing: Vec<NodeId> = self
            .accessor
            .children(tree, parent)
            .into_iter()
            .skip(desired.len())
            .collect();
        for node in trailing {
            tree.detach(node)?;
            stats.removed += 1;
        }

        if !stats.is_noop() {
            tracing::debug!(
                "reconciled {}: +{} -{} ~{}",
                parent,
                stats.inserted,
                stats.removed,
                stats.separators
            );
        }
        Ok(stats)
    }

    fn is_masked(&self, originals: &[NodeId], node: NodeId) -> bool {
        originals
            .iter()
            .position(|o| *o == node)
            .and_then(|pos| self.removal_mask.get(pos))
            .copied()
            .unwrap_or(false)
    }
}

/// Reconcile `parent` with the default list accessor
///
/// # Errors
/// Same as [`SequenceReconciler::reconcile`].
pub fn synchronize_list(
    tree: &mut dyn SyntaxTree,
    parent: NodeId,
    desired: &[Option<NodeId>],
    removal_mask: &[bool],
) -> Result<ReconcileStats, ReconcileError> {
    SequenceReconciler::new(&crate::accessor::ListElements)
        .with_removal_mask(removal_mask)
        .reconcile(tree, parent, desired)
}
