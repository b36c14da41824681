//! Node identities and kinds
//!
//! Provides [`NodeId`], a copyable handle into a structural tree, and
//! [`NodeKind`], the closed set of node shapes the engine understands.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Handle to a node inside one [`SyntaxTree`](crate::SyntaxTree)
///
/// Handles are only meaningful for the tree that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Create handle from raw index
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Index usable for arena lookups
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural node kinds
///
/// Child layout per kind (optional children in brackets):
/// - `Class`: `Modifiers`, members. Text is the class name, empty when anonymous.
/// - `Method`: `[DocComment] [Contract] Modifiers TypeRef Name ParameterList ThrowsList [Block]`
/// - `Constructor`: same as `Method` without the return `TypeRef`
/// - `Field`: `Modifiers TypeRef Name [initializer]`
/// - `Parameter`: `TypeRef Name` (lambda parameters may carry an empty type)
/// - `LocalVar`: `TypeRef Name [initializer]`
/// - `Try`: `[ResourceList] Block Catch* [Finally]`
/// - `Catch`: `Parameter Block`
/// - `Call`: `Reference ArgumentList`; the reference text is the callee name
///   (`super`/`this` for constructor chaining)
/// - `Reference`: `[qualifier]`; text is the referenced name
/// - `New`: `TypeRef ArgumentList [Class]`
/// - `NewArray`: `TypeRef ArrayInit`; the type is the array type (`int[]`)
/// - `Assignment`: `Reference value`
/// - `Lambda`: `ParameterList body`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Compilation unit; text is the package name
    File,
    /// Class or interface declaration
    Class,
    /// Method declaration
    Method,
    /// Constructor declaration
    Constructor,
    /// Field declaration
    Field,
    /// Space separated modifier keywords
    Modifiers,
    /// Identifier
    Name,
    /// Type text (`int`, `String[]`, `int...`, `void`)
    TypeRef,
    /// Formal parameter list
    ParameterList,
    /// Formal parameter
    Parameter,
    /// Declared thrown exceptions
    ThrowsList,
    /// Statement block
    Block,
    /// Expression used as a statement
    ExprStatement,
    /// Local variable declaration
    LocalVar,
    /// Return statement
    Return,
    /// Throw statement
    Throw,
    /// Try statement
    Try,
    /// Try-with-resources list
    ResourceList,
    /// Catch section
    Catch,
    /// Finally section
    Finally,
    /// Method or constructor-chaining call
    Call,
    /// Actual argument list
    ArgumentList,
    /// Name reference with optional qualifier
    Reference,
    /// Object creation
    New,
    /// Array creation with initializer
    NewArray,
    /// Array initializer elements
    ArrayInit,
    /// Opaque expression text (literals and anything not modelled)
    Expression,
    /// Assignment expression
    Assignment,
    /// Lambda expression
    Lambda,
    /// Method reference (`Qualifier::name`)
    MethodRef,
    /// Documentation comment; text is the description
    DocComment,
    /// `@param` tag; text is the parameter name
    DocParam,
    /// Declarative contract; text is the clause list
    Contract,
    /// Empty list slot left for the user to fill
    Separator,
}

impl NodeKind {
    /// Method or constructor
    #[inline]
    #[must_use]
    pub const fn is_declaration(self) -> bool {
        matches!(self, Self::Method | Self::Constructor)
    }

    /// Statement kinds that may live directly in a block
    #[inline]
    #[must_use]
    pub const fn is_statement(self) -> bool {
        matches!(
            self,
            Self::Block
                | Self::ExprStatement
                | Self::LocalVar
                | Self::Return
                | Self::Throw
                | Self::Try
        )
    }

    /// Comma separated list kinds
    #[inline]
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(
            self,
            Self::ParameterList | Self::ArgumentList | Self::ThrowsList | Self::ArrayInit
        )
    }

    /// Nodes that introduce a variable name
    #[inline]
    #[must_use]
    pub const fn is_variable(self) -> bool {
        matches!(self, Self::Field | Self::Parameter | Self::LocalVar)
    }

    /// Expressions whose evaluation may have side effects
    #[inline]
    #[must_use]
    pub const fn has_side_effects(self) -> bool {
        matches!(self, Self::Call | Self::New | Self::Assignment)
    }
}
