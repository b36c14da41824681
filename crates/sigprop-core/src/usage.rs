//! Classified usages
//!
//! Provides [`Usage`], the closed set of ways a site can depend on the
//! declaration being changed. Every variant carries the node it edits.

use sigprop_tree::NodeId;

/// A site that must change along with the declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Usage {
    /// Call or `new` expression (including `super(...)`/`this(...)`)
    Call {
        /// Call node
        site: NodeId,
        /// Declaration the call resolves to (target, overrider or propagated caller)
        referenced: NodeId,
        /// Rewrite the argument list
        to_change_arguments: bool,
        /// Handle newly thrown exceptions at the site
        to_catch_exceptions: bool,
        /// Callee was variadic before the change
        is_vararg_call: bool,
    },
    /// Declaration overriding the target or a propagated caller
    Overrider {
        /// Overriding declaration
        overriding: NodeId,
        /// Declaration it overrides
        base: NodeId,
        /// Overrides the target itself
        is_original_overrider: bool,
        /// Change its parameters
        modify_args: bool,
        /// Change its throws list
        modify_exceptions: bool,
    },
    /// Caller receiving the new parameters and/or exceptions
    CallerPropagation {
        /// Caller declaration
        caller: NodeId,
        /// Append the new parameters
        insert_params: bool,
        /// Append the new exceptions
        insert_throws: bool,
    },
    /// Subclass constructor chaining implicitly to the target constructor
    ConstructorImplicit {
        /// Constructor without explicit `super(...)`
        implicit_ctor: NodeId,
        /// Class declaring it
        owning_class: NodeId,
    },
    /// Subclass declaring no constructor at all
    MissingConstructor {
        /// Class receiving a synthesized constructor
        owning_class: NodeId,
    },
    /// Method reference or lambda whose shape must change
    FunctionalConversion {
        /// Method reference or lambda node
        site: NodeId,
        /// Functional interface method, when known
        interface_method: Option<NodeId>,
    },
    /// Reference to a renamed parameter inside a changed body
    ParameterRename {
        /// Reference node
        site: NodeId,
        /// Name before the change
        old_name: String,
        /// Name after the change
        new_name: String,
    },
    /// Field mirroring a constructor parameter
    ComponentDeclaration {
        /// Field node
        site: NodeId,
        /// New field name
        new_name: String,
        /// New field type
        new_type: String,
    },
    /// Reference that only needs renaming
    PlainReference {
        /// Reference or method reference node
        site: NodeId,
    },
}

impl Usage {
    /// Node this usage edits
    #[must_use]
    pub fn site(&self) -> NodeId {
        match self {
            Self::Call { site, .. }
            | Self::FunctionalConversion { site, .. }
            | Self::ParameterRename { site, .. }
            | Self::ComponentDeclaration { site, .. }
            | Self::PlainReference { site } => *site,
            Self::Overrider { overriding, .. } => *overriding,
            Self::CallerPropagation { caller, .. } => *caller,
            Self::ConstructorImplicit { implicit_ctor, .. } => *implicit_ctor,
            Self::MissingConstructor { owning_class } => *owning_class,
        }
    }

    /// Variant name for diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Call { .. } => "call",
            Self::Overrider { .. } => "overrider",
            Self::CallerPropagation { .. } => "caller-propagation",
            Self::ConstructorImplicit { .. } => "implicit-constructor",
            Self::MissingConstructor { .. } => "missing-constructor",
            Self::FunctionalConversion { .. } => "functional-conversion",
            Self::ParameterRename { .. } => "parameter-rename",
            Self::ComponentDeclaration { .. } => "component",
            Self::PlainReference { .. } => "reference",
        }
    }

    /// Whether the usage rewrites a declaration rather than a reference
    #[inline]
    #[must_use]
    pub fn is_declaration_usage(&self) -> bool {
        matches!(
            self,
            Self::Overrider { .. } | Self::CallerPropagation { .. } | Self::MissingConstructor { .. }
        )
    }

    /// Whether the usage is edited before the declaration changes
    #[inline]
    #[must_use]
    pub fn is_before_phase(&self) -> bool {
        self.is_declaration_usage() || matches!(self, Self::FunctionalConversion { .. })
    }
}
