//! Children accessors
//!
//! A [`ChildrenAccessor`] decides which children of a parent take part in
//! reconciliation. Closures work directly; [`ListElements`] and
//! [`ChildrenOfKind`] cover the list shapes the engine patches.

use sigprop_tree::{NodeId, NodeKind, SyntaxTree};

/// Produces the live, ordered children a reconciliation works on
pub trait ChildrenAccessor {
    /// Current children of `parent`
    fn children(&self, tree: &dyn SyntaxTree, parent: NodeId) -> Vec<NodeId>;
}

impl<F> ChildrenAccessor for F
where
    F: Fn(&dyn SyntaxTree, NodeId) -> Vec<NodeId>,
{
    fn children(&self, tree: &dyn SyntaxTree, parent: NodeId) -> Vec<NodeId> {
        self(tree, parent)
    }
}

/// Every child of a list node, holes included
///
/// Used for argument, parameter, throws and array-initializer lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListElements;

impl ChildrenAccessor for ListElements {
    fn children(&self, tree: &dyn SyntaxTree, parent: NodeId) -> Vec<NodeId> {
        tree.children(parent)
    }
}

/// Children of one kind (plus holes), ignoring everything else
///
/// Used for `@param` tags inside a documentation comment.
#[derive(Debug, Clone, Copy)]
pub struct ChildrenOfKind(pub NodeKind);

impl ChildrenAccessor for ChildrenOfKind {
    fn children(&self, tree: &dyn SyntaxTree, parent: NodeId) -> Vec<NodeId> {
        tree.children(parent)
            .into_iter()
            .filter(|c| {
                let kind = tree.kind(*c);
                kind == self.0 || kind == NodeKind::Separator
            })
            .collect()
    }
}
