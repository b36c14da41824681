//! Scoped write transactions
//!
//! Provides [`WriteTransaction`], a [`SyntaxTree`] wrapper that journals the
//! inverse of every successful edit. Dropping an uncommitted transaction
//! undoes the journal in reverse order, so the wrapped tree is left exactly
//! as it was when the transaction began.

use crate::error::TreeError;
use crate::node::{NodeId, NodeKind};
use crate::tree::SyntaxTree;

#[derive(Debug, Clone)]
enum JournalEntry {
    Inserted {
        child: NodeId,
        previous: Option<(NodeId, usize)>,
    },
    Detached {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    TextSet {
        node: NodeId,
        previous: String,
    },
}

/// Single undoable unit of tree edits
///
/// Reads and writes go straight to the wrapped tree; only the undo journal
/// is kept here.
pub struct WriteTransaction<'t, T: SyntaxTree + ?Sized> {
    tree: &'t mut T,
    journal: Vec<JournalEntry>,
    committed: bool,
}

impl<'t, T: SyntaxTree + ?Sized> WriteTransaction<'t, T> {
    /// Begin transaction over `tree`
    #[inline]
    #[must_use]
    pub fn begin(tree: &'t mut T) -> Self {
        Self {
            tree,
            journal: Vec::new(),
            committed: false,
        }
    }

    /// Number of journaled edits so far
    #[inline]
    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.journal.len()
    }

    /// Keep all edits; returns the number of edits made
    pub fn commit(mut self) -> usize {
        self.committed = true;
        let count = self.journal.len();
        self.journal.clear();
        tracing::debug!("committed transaction with {} edits", count);
        count
    }

    /// Undo all edits now
    pub fn rollback(mut self) {
        self.undo_all();
        self.committed = true;
    }

    fn undo_all(&mut self) {
        let count = self.journal.len();
        while let Some(entry) = self.journal.pop() {
            let result = match entry {
                JournalEntry::Inserted { child, previous } => {
                    self.tree.detach(child).and_then(|()| match previous {
                        Some((parent, index)) => self.tree.insert_child(parent, index, child),
                        None => Ok(()),
                    })
                }
                JournalEntry::Detached { node, parent, index } => {
                    self.tree.insert_child(parent, index, node)
                }
                JournalEntry::TextSet { node, previous } => self.tree.set_text(node, &previous),
            };
            if let Err(e) = result {
                tracing::error!("rollback step failed: {}", e);
            }
        }
        if count > 0 {
            tracing::warn!("rolled back {} edits", count);
        }
    }
}

impl<T: SyntaxTree + ?Sized> Drop for WriteTransaction<'_, T> {
    fn drop(&mut self) {
        if !self.committed {
            self.undo_all();
        }
    }
}

impl<T: SyntaxTree + ?Sized> SyntaxTree for WriteTransaction<'_, T> {
    fn kind(&self, node: NodeId) -> NodeKind {
        self.tree.kind(node)
    }

    fn text(&self, node: NodeId) -> &str {
        self.tree.text(node)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.children(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }

    fn is_writable(&self, node: NodeId) -> bool {
        self.tree.is_writable(node)
    }

    fn create(&mut self, kind: NodeKind, text: &str) -> NodeId {
        self.tree.create(kind, text)
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        let previous = self
            .tree
            .parent(child)
            .and_then(|p| self.tree.child_index(child).map(|i| (p, i)));
        self.tree.insert_child(parent, index, child)?;
        self.journal.push(JournalEntry::Inserted { child, previous });
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.tree.parent(node) else {
            return Ok(());
        };
        let index = self.tree.child_index(node).unwrap_or_default();
        self.tree.detach(node)?;
        self.journal.push(JournalEntry::Detached { node, parent, index });
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        let previous = self.tree.text(node).to_string();
        self.tree.set_text(node, text)?;
        self.journal.push(JournalEntry::TextSet { node, previous });
        Ok(())
    }
}
