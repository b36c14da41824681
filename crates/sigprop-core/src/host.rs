//! Host interfaces
//!
//! The engine never resolves names or types itself. Reference search,
//! type questions and user interaction are supplied by the embedding host
//! through [`SearchProvider`], [`SemanticModel`] and [`PolicyHook`].

use crate::conflict::ConflictReport;
use sigprop_delta::ParameterDelta;
use sigprop_tree::{containing_class, top_level_class, NodeId, NodeKind, SyntaxTree, Visibility};

/// One reference found by the host's search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawUsage {
    /// Referencing node (call, method reference, class, constructor, ...)
    pub site: NodeId,
    /// Declaration the site resolves to
    pub resolved: NodeId,
}

impl RawUsage {
    /// Create raw usage
    #[inline]
    #[must_use]
    pub fn new(site: NodeId, resolved: NodeId) -> Self {
        Self { site, resolved }
    }
}

/// Reference search supplied by the host
pub trait SearchProvider {
    /// Sites referring to `declaration`
    ///
    /// For a constructor this includes `new` expressions, explicit
    /// `super(...)`/`this(...)` calls, subclass constructors that chain
    /// implicitly and subclasses declaring no constructor at all.
    fn find_usages(&self, tree: &dyn SyntaxTree, declaration: NodeId) -> Vec<RawUsage>;

    /// Declarations overriding `declaration`, transitively
    fn find_overriders(&self, tree: &dyn SyntaxTree, declaration: NodeId) -> Vec<NodeId>;

    /// Declarations `declaration` overrides
    fn find_super_declarations(&self, tree: &dyn SyntaxTree, declaration: NodeId) -> Vec<NodeId>;
}

/// Type and resolution questions supplied by the host
pub trait SemanticModel {
    /// Whether `sub` is `sup` or one of its subtypes
    fn is_subtype(&self, sub: &str, sup: &str) -> bool;

    /// Whether the exception type must be declared or caught
    fn is_checked_exception(&self, type_text: &str) -> bool;

    /// Declaration a call, `new` expression or method reference resolves to
    fn resolve_reference(&self, tree: &dyn SyntaxTree, site: NodeId) -> Option<NodeId>;

    /// Whether a value of type `from` can be assigned to `to`
    fn is_assignable(&self, to: &str, from: &str) -> bool {
        to == from || self.is_subtype(from, to)
    }

    /// Whether a catch of this type may also catch unchecked exceptions
    fn may_catch_unchecked(&self, type_text: &str) -> bool {
        !self.is_checked_exception(type_text)
            || self.is_subtype("RuntimeException", type_text)
            || self.is_subtype("Error", type_text)
    }

    /// Package name of the file containing `node`
    fn package_of(&self, tree: &dyn SyntaxTree, node: NodeId) -> String {
        tree.nearest_ancestor(node, &|k: NodeKind| k == NodeKind::File)
            .map(|f| tree.text(f).to_string())
            .unwrap_or_default()
    }

    /// Whether class `class` extends class `base`
    fn is_inheritor(&self, tree: &dyn SyntaxTree, class: NodeId, base: NodeId) -> bool {
        class != base && self.is_subtype(tree.text(class), tree.text(base))
    }

    /// Whether a member with `visibility` declared at `member` can be used from `site`
    fn is_accessible(
        &self,
        tree: &dyn SyntaxTree,
        member: NodeId,
        visibility: Visibility,
        site: NodeId,
    ) -> bool {
        match visibility {
            Visibility::Public => true,
            Visibility::Private => top_level_class(tree, member) == top_level_class(tree, site),
            Visibility::Package => self.package_of(tree, member) == self.package_of(tree, site),
            Visibility::Protected => {
                if self.package_of(tree, member) == self.package_of(tree, site) {
                    return true;
                }
                let Some(owner) = containing_class(tree, member) else {
                    return false;
                };
                let mut class = containing_class(tree, site);
                while let Some(c) = class {
                    if self.is_inheritor(tree, c, owner) {
                        return true;
                    }
                    class = containing_class(tree, c);
                }
                false
            }
        }
    }

    /// Exception types an expression or `throw` statement may raise
    fn thrown_by(&self, tree: &dyn SyntaxTree, node: NodeId) -> Vec<String> {
        match tree.kind(node) {
            NodeKind::Call | NodeKind::New => self
                .resolve_reference(tree, node)
                .and_then(|decl| tree.child_of_kind(decl, NodeKind::ThrowsList))
                .map(|throws| {
                    tree.children(throws)
                        .into_iter()
                        .map(|t| tree.text(t).to_string())
                        .collect()
                })
                .unwrap_or_default(),
            NodeKind::Throw => tree
                .children(node)
                .first()
                .filter(|e| tree.kind(**e) == NodeKind::New)
                .and_then(|e| tree.child_of_kind(*e, NodeKind::TypeRef))
                .map(|t| vec![tree.text(t).to_string()])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Type text as seen from `context` (type parameters substituted)
    fn substitute(&self, _tree: &dyn SyntaxTree, _context: NodeId, type_text: &str) -> String {
        type_text.to_string()
    }

    /// Type text with generic arguments erased
    fn erasure(&self, type_text: &str) -> String {
        let mut out = String::with_capacity(type_text.len());
        let mut depth = 0usize;
        for c in type_text.chars() {
            match c {
                '<' => depth += 1,
                '>' => depth = depth.saturating_sub(1),
                _ if depth == 0 => out.push(c),
                _ => {}
            }
        }
        out
    }

    /// Value the host wants passed for a new parameter at `call`
    fn actual_value(
        &self,
        _tree: &dyn SyntaxTree,
        _call: NodeId,
        _parameter: &ParameterDelta,
    ) -> Option<String> {
        None
    }

    /// Interface method a method reference or lambda is converted to
    fn functional_method(&self, _tree: &dyn SyntaxTree, _site: NodeId) -> Option<NodeId> {
        None
    }
}

/// Answer of a [`PolicyHook`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Continue and apply
    Proceed,
    /// Stop without changes
    Abort,
}

/// User interaction supplied by interactive hosts
#[cfg_attr(test, mockall::automock)]
pub trait PolicyHook {
    /// Confirm applying despite the reported conflicts
    fn confirm(&self, report: &ConflictReport) -> Decision;

    /// Choose a call-site value for a new parameter; `None` cancels the run
    fn choose_default_value(&self, name: &str, type_text: &str) -> Option<String>;
}
