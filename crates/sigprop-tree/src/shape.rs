//! Typed views over node layouts
//!
//! Provides [`DeclarationShape`], [`CallShape`] and [`SignatureView`] so
//! callers do not have to re-derive child positions by hand.

use crate::error::TreeError;
use crate::node::{NodeId, NodeKind};
use crate::tree::SyntaxTree;
use crate::visibility::Visibility;
use serde::{Deserialize, Serialize};

/// Child handles of a method or constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationShape {
    /// Declaration node
    pub decl: NodeId,
    /// Documentation comment
    pub doc: Option<NodeId>,
    /// Contract annotation
    pub contract: Option<NodeId>,
    /// Modifier keywords
    pub modifiers: NodeId,
    /// Return type, absent on constructors
    pub return_type: Option<NodeId>,
    /// Name identifier
    pub name: NodeId,
    /// Formal parameters
    pub parameters: NodeId,
    /// Declared exceptions
    pub throws: NodeId,
    /// Body, absent on abstract methods
    pub body: Option<NodeId>,
}

impl DeclarationShape {
    /// Read shape of a declaration
    ///
    /// # Errors
    /// Returns error if the node is not a declaration or misses a child.
    pub fn read<T: SyntaxTree + ?Sized>(tree: &T, decl: NodeId) -> Result<Self, TreeError> {
        let kind = tree.kind(decl);
        if !kind.is_declaration() {
            return Err(TreeError::malformed(decl, kind, "not a method or constructor"));
        }
        let require = |k: NodeKind| {
            tree.child_of_kind(decl, k)
                .ok_or_else(|| TreeError::malformed(decl, kind, format!("missing {k:?}")))
        };
        Ok(Self {
            decl,
            doc: tree.child_of_kind(decl, NodeKind::DocComment),
            contract: tree.child_of_kind(decl, NodeKind::Contract),
            modifiers: require(NodeKind::Modifiers)?,
            return_type: tree.child_of_kind(decl, NodeKind::TypeRef),
            name: require(NodeKind::Name)?,
            parameters: require(NodeKind::ParameterList)?,
            throws: require(NodeKind::ThrowsList)?,
            body: tree.child_of_kind(decl, NodeKind::Block),
        })
    }

    /// Formal parameter nodes
    #[must_use]
    pub fn parameter_nodes<T: SyntaxTree + ?Sized>(&self, tree: &T) -> Vec<NodeId> {
        tree.children_of_kind(self.parameters, NodeKind::Parameter)
    }
}

/// Child handles of a call-shaped expression (`Call` or `New`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallShape {
    /// Call node
    pub call: NodeId,
    /// Callee reference (`Call` only)
    pub reference: Option<NodeId>,
    /// Actual arguments
    pub arguments: NodeId,
}

impl CallShape {
    /// Read shape of a call or object creation
    #[must_use]
    pub fn read<T: SyntaxTree + ?Sized>(tree: &T, call: NodeId) -> Option<Self> {
        if !matches!(tree.kind(call), NodeKind::Call | NodeKind::New) {
            return None;
        }
        Some(Self {
            call,
            reference: tree.child_of_kind(call, NodeKind::Reference),
            arguments: tree.child_of_kind(call, NodeKind::ArgumentList)?,
        })
    }

    /// Callee name (`super`/`this` for constructor chaining)
    #[must_use]
    pub fn callee_name<'t, T: SyntaxTree + ?Sized>(&self, tree: &'t T) -> Option<&'t str> {
        self.reference.map(|r| tree.text(r))
    }

    /// Whether the call is a `super(...)` or `this(...)` chaining call
    #[must_use]
    pub fn is_chaining<T: SyntaxTree + ?Sized>(&self, tree: &T) -> bool {
        matches!(self.callee_name(tree), Some("super" | "this"))
            && self
                .reference
                .is_some_and(|r| tree.children(r).is_empty())
    }

    /// Qualifier of the callee reference
    #[must_use]
    pub fn qualifier<T: SyntaxTree + ?Sized>(&self, tree: &T) -> Option<NodeId> {
        self.reference.and_then(|r| tree.children(r).first().copied())
    }
}

/// Formal parameter as plain text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterView {
    /// Parameter name
    pub name: String,
    /// Declared type text
    pub type_text: String,
}

/// Snapshot of a declaration signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureView {
    /// Declaration name
    pub name: String,
    /// Access level
    pub visibility: Visibility,
    /// Return type, `None` for constructors
    pub return_type: Option<String>,
    /// Formal parameters in order
    pub parameters: Vec<ParameterView>,
    /// Declared exception types in order
    pub exceptions: Vec<String>,
}

impl SignatureView {
    /// Read current signature of a declaration
    ///
    /// # Errors
    /// Returns error if the node is not a well-formed declaration.
    pub fn read<T: SyntaxTree + ?Sized>(tree: &T, decl: NodeId) -> Result<Self, TreeError> {
        let shape = DeclarationShape::read(tree, decl)?;
        let parameters = shape
            .parameter_nodes(tree)
            .into_iter()
            .map(|p| {
                let (type_text, name) = variable_parts(tree, p);
                ParameterView {
                    name: name.to_string(),
                    type_text: type_text.to_string(),
                }
            })
            .collect();
        let exceptions = tree
            .children(shape.throws)
            .into_iter()
            .map(|t| tree.text(t).to_string())
            .collect();
        Ok(Self {
            name: tree.text(shape.name).to_string(),
            visibility: Visibility::from_modifiers(tree.text(shape.modifiers)),
            return_type: shape.return_type.map(|r| tree.text(r).to_string()),
            parameters,
            exceptions,
        })
    }

    /// Whether the declaration is a constructor
    #[inline]
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.return_type.is_none()
    }

    /// Whether the last parameter is variadic
    #[must_use]
    pub fn is_vararg(&self) -> bool {
        self.parameters
            .last()
            .is_some_and(|p| p.type_text.ends_with("..."))
    }
}

/// Type text and name of a variable-like node (field, parameter, local)
#[must_use]
pub fn variable_parts<T: SyntaxTree + ?Sized>(tree: &T, var: NodeId) -> (&str, &str) {
    let ty = tree
        .child_of_kind(var, NodeKind::TypeRef)
        .map(|t| tree.text(t))
        .unwrap_or_default();
    let name = tree
        .child_of_kind(var, NodeKind::Name)
        .map(|n| tree.text(n))
        .unwrap_or_default();
    (ty, name)
}

/// Initializer expression of a field or local variable
#[must_use]
pub fn variable_initializer<T: SyntaxTree + ?Sized>(tree: &T, var: NodeId) -> Option<NodeId> {
    tree.children(var).into_iter().find(|c| {
        !matches!(
            tree.kind(*c),
            NodeKind::Modifiers | NodeKind::TypeRef | NodeKind::Name
        )
    })
}

/// Nearest enclosing class
#[must_use]
pub fn containing_class<T: SyntaxTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    tree.nearest_ancestor(node, &|k: NodeKind| k == NodeKind::Class)
}

/// Nearest enclosing method or constructor
#[must_use]
pub fn enclosing_declaration<T: SyntaxTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    tree.nearest_ancestor(node, &NodeKind::is_declaration)
}

/// Outermost enclosing class, used for private access checks
#[must_use]
pub fn top_level_class<T: SyntaxTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    let mut result = None;
    let mut current = if tree.kind(node) == NodeKind::Class {
        Some(node)
    } else {
        containing_class(tree, node)
    };
    while let Some(class) = current {
        result = Some(class);
        current = containing_class(tree, class);
    }
    result
}

/// Constructors declared directly in a class
#[must_use]
pub fn constructors_of<T: SyntaxTree + ?Sized>(tree: &T, class: NodeId) -> Vec<NodeId> {
    tree.children_of_kind(class, NodeKind::Constructor)
}

/// Nearest enclosing statement that lives directly in a block
#[must_use]
pub fn enclosing_statement<T: SyntaxTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        let parent = tree.parent(current)?;
        if tree.kind(parent) == NodeKind::Block && tree.kind(current).is_statement() {
            return Some(current);
        }
        if matches!(tree.kind(parent), NodeKind::Lambda | NodeKind::Class) {
            return None;
        }
        current = parent;
    }
}
