//! In-memory arena tree
//!
//! Provides [`MemoryTree`], a [`SyntaxTree`] backed by a flat node arena.
//! Detached nodes are never freed; the arena only grows for the lifetime of
//! the tree.

use crate::error::TreeError;
use crate::node::{NodeId, NodeKind};
use crate::render::render;
use crate::tree::SyntaxTree;
use smallvec::SmallVec;

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    text: String,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    writable: bool,
}

/// Arena-backed structural tree
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    nodes: Vec<NodeData>,
}

impl MemoryTree {
    /// Create empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever created
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no node was created yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if handle belongs to this tree
    #[inline]
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    /// Mark node (and its subtree) read-only or writable again
    ///
    /// # Errors
    /// Returns error if the handle is unknown.
    pub fn set_writable(&mut self, node: NodeId, writable: bool) -> Result<(), TreeError> {
        self.data_mut(node)?.writable = writable;
        Ok(())
    }

    /// Render subtree as source text
    #[must_use]
    pub fn render(&self, node: NodeId) -> String {
        render(self, node)
    }

    fn data(&self, node: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes
            .get(node.index())
            .ok_or(TreeError::UnknownNode(node))
    }

    fn data_mut(&mut self, node: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes
            .get_mut(node.index())
            .ok_or(TreeError::UnknownNode(node))
    }

    fn check_writable(&self, node: NodeId) -> Result<(), TreeError> {
        if self.is_writable(node) {
            Ok(())
        } else {
            Err(TreeError::ReadOnly(node))
        }
    }

    fn unlink(&mut self, node: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.data(node)?.parent else {
            return Ok(());
        };
        self.check_writable(parent)?;
        self.data_mut(parent)?.children.retain(|c| *c != node);
        self.data_mut(node)?.parent = None;
        Ok(())
    }
}

impl SyntaxTree for MemoryTree {
    fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node.index()].kind
    }

    fn text(&self, node: NodeId) -> &str {
        &self.nodes[node.index()].text
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.index()].children.to_vec()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index()).and_then(|n| n.parent)
    }

    fn is_writable(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            match self.nodes.get(n.index()) {
                Some(data) if data.writable => current = data.parent,
                _ => return false,
            }
        }
        true
    }

    fn create(&mut self, kind: NodeKind, text: &str) -> NodeId {
        // Arena size is bounded by u32 handles.
        let id = NodeId::new(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(NodeData {
            kind,
            text: text.to_string(),
            parent: None,
            children: SmallVec::new(),
            writable: true,
        });
        id
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        self.data(child)?;
        self.check_writable(parent)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        self.unlink(child)?;
        let len = self.data(parent)?.children.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { parent, index, len });
        }
        self.data_mut(parent)?.children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> Result<(), TreeError> {
        self.unlink(node)
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        self.check_writable(node)?;
        self.data_mut(node)?.text = text.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_with(tree: &mut MemoryTree, items: &[&str]) -> (NodeId, Vec<NodeId>) {
        let list = tree.create(NodeKind::ArgumentList, "");
        let ids: Vec<_> = items
            .iter()
            .map(|t| {
                let id = tree.create(NodeKind::Expression, t);
                tree.append(list, id).unwrap();
                id
            })
            .collect();
        (list, ids)
    }

    #[test]
    fn test_insert_moves_instead_of_copying() {
        let mut tree = MemoryTree::new();
        let (list, ids) = list_with(&mut tree, &["a", "b", "c"]);

        tree.insert_before(list, Some(ids[0]), ids[2]).unwrap();

        assert_eq!(tree.children(list), vec![ids[2], ids[0], ids[1]]);
        assert_eq!(tree.parent(ids[2]), Some(list));
    }

    #[test]
    fn test_insert_before_later_sibling() {
        let mut tree = MemoryTree::new();
        let (list, ids) = list_with(&mut tree, &["a", "b", "c"]);

        tree.insert_before(list, Some(ids[2]), ids[0]).unwrap();

        assert_eq!(tree.children(list), vec![ids[1], ids[0], ids[2]]);
    }

    #[test]
    fn test_read_only_subtree_rejects_edits() {
        let mut tree = MemoryTree::new();
        let (list, ids) = list_with(&mut tree, &["a"]);
        tree.set_writable(list, false).unwrap();

        assert!(!tree.is_writable(ids[0]));
        assert_eq!(tree.detach(ids[0]), Err(TreeError::ReadOnly(list)));
        assert!(tree.set_text(ids[0], "z").unwrap_err().is_read_only());
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = MemoryTree::new();
        let outer = tree.create(NodeKind::Block, "");
        let inner = tree.create(NodeKind::Block, "");
        tree.append(outer, inner).unwrap();

        assert_eq!(
            tree.append(inner, outer),
            Err(TreeError::Cycle {
                parent: inner,
                child: outer
            })
        );
    }

    #[test]
    fn test_deep_copy_is_detached_and_equal() {
        let mut tree = MemoryTree::new();
        let (list, _) = list_with(&mut tree, &["1", "2"]);

        let copy = tree.deep_copy(list).unwrap();

        assert_ne!(copy, list);
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.render(copy), tree.render(list));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut tree = MemoryTree::new();
        let (list, ids) = list_with(&mut tree, &["a", "b", "c"]);
        let z = tree.create(NodeKind::Expression, "z");

        tree.replace(ids[1], z).unwrap();

        assert_eq!(tree.children(list), vec![ids[0], z, ids[2]]);
        assert_eq!(tree.parent(ids[1]), None);
    }
}
