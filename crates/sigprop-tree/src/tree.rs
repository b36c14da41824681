//! Structural tree abstraction
//!
//! Provides [`SyntaxTree`], the narrow set of node operations the engine
//! performs on the host program. Hosts implement the required primitives;
//! navigation and compound edits come for free as provided methods.

use crate::error::TreeError;
use crate::node::{NodeId, NodeKind};

/// Mutable structural program tree
///
/// Implementations must keep parent links consistent with child lists.
/// Reads of a handle from a different tree may panic.
pub trait SyntaxTree {
    /// Kind of node
    fn kind(&self, node: NodeId) -> NodeKind;

    /// Text payload (identifier, type text, opaque expression)
    fn text(&self, node: NodeId) -> &str;

    /// Live children, in order
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Parent, `None` for roots and detached nodes
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Whether the node and all of its ancestors accept edits
    fn is_writable(&self, node: NodeId) -> bool;

    /// Create a detached node
    fn create(&mut self, kind: NodeKind, text: &str) -> NodeId;

    /// Insert `child` at `index` under `parent`
    ///
    /// A child already attached elsewhere is moved, never duplicated.
    ///
    /// # Errors
    /// Fails if either affected parent is read-only, the index is out of
    /// range, or the insertion would create a cycle.
    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId)
        -> Result<(), TreeError>;

    /// Detach node from its parent (no-op for detached nodes)
    ///
    /// # Errors
    /// Fails if the parent is read-only.
    fn detach(&mut self, node: NodeId) -> Result<(), TreeError>;

    /// Replace text payload
    ///
    /// # Errors
    /// Fails if the node is read-only.
    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError>;

    /// Position of node within its parent
    fn child_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|c| *c == node)
    }

    /// Insert `node` before `anchor`, or append when `anchor` is `None`
    ///
    /// # Errors
    /// Propagates [`SyntaxTree::insert_child`] failures; an anchor that is
    /// not a child of `parent` is malformed.
    fn insert_before(
        &mut self,
        parent: NodeId,
        anchor: Option<NodeId>,
        node: NodeId,
    ) -> Result<(), TreeError> {
        let children = self.children(parent);
        let mut index = match anchor {
            Some(anchor) => children.iter().position(|c| *c == anchor).ok_or_else(|| {
                TreeError::malformed(parent, self.kind(parent), format!("{anchor} is not a child"))
            })?,
            None => children.len(),
        };
        // Moving a node forward within the same parent shifts the anchor left.
        if let Some(current) = children.iter().position(|c| *c == node) {
            if current < index {
                index -= 1;
            }
        }
        self.insert_child(parent, index, node)
    }

    /// Insert `node` right after `anchor`
    ///
    /// # Errors
    /// Same as [`SyntaxTree::insert_before`].
    fn insert_after(&mut self, parent: NodeId, anchor: NodeId, node: NodeId) -> Result<(), TreeError> {
        let children = self.children(parent);
        let next = children
            .iter()
            .position(|c| *c == anchor)
            .and_then(|i| children.get(i + 1).copied());
        self.insert_before(parent, next, node)
    }

    /// Append `node` as last child
    ///
    /// # Errors
    /// Same as [`SyntaxTree::insert_child`].
    fn append(&mut self, parent: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.insert_before(parent, None, node)
    }

    /// Delete node (alias of [`SyntaxTree::detach`])
    ///
    /// # Errors
    /// Same as [`SyntaxTree::detach`].
    fn delete(&mut self, node: NodeId) -> Result<(), TreeError> {
        self.detach(node)
    }

    /// Put `new` where `old` is and detach `old`
    ///
    /// # Errors
    /// Fails if `old` is detached or its parent is read-only.
    fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        let parent = self
            .parent(old)
            .ok_or_else(|| TreeError::malformed(old, self.kind(old), "cannot replace a detached node"))?;
        self.insert_before(parent, Some(old), new)?;
        self.detach(old)
    }

    /// Detached structural copy of a subtree
    ///
    /// # Errors
    /// Only fails if the host refuses to edit freshly created nodes.
    fn deep_copy(&mut self, node: NodeId) -> Result<NodeId, TreeError> {
        let kind = self.kind(node);
        let text = self.text(node).to_string();
        let copy = self.create(kind, &text);
        for child in self.children(node) {
            let child_copy = self.deep_copy(child)?;
            self.append(copy, child_copy)?;
        }
        Ok(copy)
    }

    /// First child of the given kind
    fn child_of_kind(&self, node: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(node).into_iter().find(|c| self.kind(*c) == kind)
    }

    /// All children of the given kind
    fn children_of_kind(&self, node: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|c| self.kind(*c) == kind)
            .collect()
    }

    /// Ancestors from the parent up to the root
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Nearest strict ancestor matching `pred`
    fn nearest_ancestor(&self, node: NodeId, pred: &dyn Fn(NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(node).into_iter().find(|a| pred(self.kind(*a)))
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).contains(&ancestor)
    }

    /// Preorder walk of the subtree rooted at `node`, including `node`
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            let children = self.children(n);
            stack.extend(children.into_iter().rev());
        }
        out
    }
}
