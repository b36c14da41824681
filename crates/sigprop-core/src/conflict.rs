//! Conflict detection
//!
//! Provides [`ConflictAnalyzer`], which inspects the classified usages
//! before anything is edited, and [`ConflictReport`], the ordered
//! node-to-conflicts multimap it produces.

use crate::config::EngineConfig;
use crate::contract::reindex_contract;
use crate::exceptions::ExceptionReconciler;
use crate::host::{SearchProvider, SemanticModel};
use crate::usage::Usage;
use indexmap::{IndexMap, IndexSet};
use sigprop_delta::SignatureDelta;
use sigprop_tree::{
    containing_class, CallShape, DeclarationShape, NodeId, NodeKind, SignatureView, SyntaxTree,
    Visibility,
};
use std::fmt::{self, Display, Formatter};

/// How serious a conflict is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// May be confirmed, or avoided by skipping the usage
    Warning,
    /// Applying would produce broken code; never applied
    Blocking,
}

/// What a conflict is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictScope {
    /// The change as a whole
    Declaration,
    /// A single usage that can be skipped
    Usage(NodeId),
}

/// Types of conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// New visibility is weaker than an overridden declaration's
    WeakerAccess,
    /// Overrider would no longer see the declaration it overrides
    InaccessibleBase,
    /// Call site would no longer see the declaration
    InaccessibleCall,
    /// Removed parameter is still read in the body
    ParameterStillUsed,
    /// Another member already has the new signature
    SignatureCollision,
    /// Contract clauses cannot follow the new parameter list
    ContractNotConvertible,
    /// Method reference becomes a lambda
    MethodReferenceExpansion,
    /// Removed argument has side effects
    SideEffectRemoved,
    /// New or renamed parameter collides with a local variable
    LocalNameCollision,
    /// Overrider declares an array where the base is variadic
    ImplicitVararg,
    /// Newly thrown exception cannot be handled at the site
    UnhandledException,
    /// More than one variable could supply a new argument
    AmbiguousDefault,
    /// No value could be found for a new argument
    MissingDefault,
}

/// One detected conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Node the conflict is reported against
    pub node: NodeId,

    /// Kind of conflict
    pub kind: ConflictKind,

    /// Severity
    pub severity: Severity,

    /// Declaration-wide or a single usage
    pub scope: ConflictScope,

    /// Human-readable description
    pub reason: String,
}

impl Conflict {
    /// Warning attached to the change as a whole
    #[must_use]
    pub fn declaration_warning(node: NodeId, kind: ConflictKind, reason: impl Into<String>) -> Self {
        Self {
            node,
            kind,
            severity: Severity::Warning,
            scope: ConflictScope::Declaration,
            reason: reason.into(),
        }
    }

    /// Warning avoidable by skipping the usage at `site`
    #[must_use]
    pub fn usage_warning(site: NodeId, kind: ConflictKind, reason: impl Into<String>) -> Self {
        Self {
            node: site,
            kind,
            severity: Severity::Warning,
            scope: ConflictScope::Usage(site),
            reason: reason.into(),
        }
    }

    /// Blocking conflict
    #[must_use]
    pub fn blocking(node: NodeId, kind: ConflictKind, reason: impl Into<String>) -> Self {
        Self {
            node,
            kind,
            severity: Severity::Blocking,
            scope: ConflictScope::Declaration,
            reason: reason.into(),
        }
    }

    /// Whether the conflict is blocking
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

/// Ordered multimap node -> conflicts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    entries: IndexMap<NodeId, Vec<Conflict>>,
}

impl ConflictReport {
    /// Create empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a conflict
    pub fn add(&mut self, conflict: Conflict) {
        self.entries.entry(conflict.node).or_default().push(conflict);
    }

    /// Append every conflict of `other`
    pub fn merge(&mut self, other: ConflictReport) {
        for conflict in other.entries.into_values().flatten() {
            self.add(conflict);
        }
    }

    /// Whether nothing was reported
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of conflicts
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Conflicts in report order
    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.entries.values().flatten()
    }

    /// Nodes with at least one conflict, in report order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.keys().copied()
    }

    /// Conflicts reported against `node`
    #[must_use]
    pub fn conflicts_for(&self, node: NodeId) -> &[Conflict] {
        self.entries.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Reasons reported against `node`
    #[must_use]
    pub fn reasons_for(&self, node: NodeId) -> Vec<&str> {
        self.conflicts_for(node)
            .iter()
            .map(|c| c.reason.as_str())
            .collect()
    }

    /// Conflicts of one kind
    #[must_use]
    pub fn of_kind(&self, kind: ConflictKind) -> Vec<&Conflict> {
        self.iter().filter(|c| c.kind == kind).collect()
    }

    /// Whether any conflict is blocking
    #[must_use]
    pub fn has_blocking(&self) -> bool {
        self.iter().any(Conflict::is_blocking)
    }

    /// Whether any conflict concerns the change as a whole
    #[must_use]
    pub fn has_declaration_conflicts(&self) -> bool {
        self.iter().any(|c| c.scope == ConflictScope::Declaration)
    }

    /// Usage sites named by usage-scoped conflicts
    #[must_use]
    pub fn usage_sites(&self) -> IndexSet<NodeId> {
        self.iter()
            .filter_map(|c| match c.scope {
                ConflictScope::Usage(site) => Some(site),
                ConflictScope::Declaration => None,
            })
            .collect()
    }
}

impl Display for ConflictReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for conflict in self.iter() {
            let severity = match conflict.severity {
                Severity::Warning => "warning",
                Severity::Blocking => "error",
            };
            writeln!(f, "{severity} at {}: {}", conflict.node, conflict.reason)?;
        }
        Ok(())
    }
}

/// Name of a declaration or class
pub(crate) fn display_name(tree: &dyn SyntaxTree, node: NodeId) -> String {
    match tree.kind(node) {
        NodeKind::Class if tree.text(node).is_empty() => "anonymous class".to_string(),
        NodeKind::Class => tree.text(node).to_string(),
        _ => tree
            .child_of_kind(node, NodeKind::Name)
            .map_or_else(|| tree.text(node).to_string(), |n| tree.text(n).to_string()),
    }
}

fn visibility_of(tree: &dyn SyntaxTree, decl: NodeId) -> Visibility {
    tree.child_of_kind(decl, NodeKind::Modifiers)
        .map_or(Visibility::Package, |m| Visibility::from_modifiers(tree.text(m)))
}

/// Detects conflicts of a pending change
pub struct ConflictAnalyzer<'a> {
    delta: &'a SignatureDelta,
    search: &'a dyn SearchProvider,
    semantics: &'a dyn SemanticModel,
    config: &'a EngineConfig,
}

impl<'a> ConflictAnalyzer<'a> {
    /// Create analyzer
    #[must_use]
    pub fn new(
        delta: &'a SignatureDelta,
        search: &'a dyn SearchProvider,
        semantics: &'a dyn SemanticModel,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            delta,
            search,
            semantics,
            config,
        }
    }

    /// Analyze `usages`
    ///
    /// Call usages that only become inaccessible, with nothing else to
    /// rewrite, are removed from `usages`.
    pub fn analyze(&self, tree: &dyn SyntaxTree, usages: &mut Vec<Usage>) -> ConflictReport {
        let mut report = ConflictReport::new();

        self.check_hierarchy_visibility(tree, usages, &mut report);
        self.check_call_accessibility(tree, usages, &mut report);
        if self.config.check_unused_parameters {
            self.check_removed_parameters(tree, usages, &mut report);
        }
        self.check_signature_collision(tree, &mut report);
        self.check_contracts(tree, usages, &mut report);
        self.check_local_collisions(tree, &mut report);
        self.check_usage_shapes(tree, usages, &mut report);

        if !report.is_empty() {
            tracing::debug!("{} conflicts for {}", report.len(), self.delta.target());
        }
        report
    }

    fn original_overriders(usages: &[Usage]) -> impl Iterator<Item = NodeId> + '_ {
        usages.iter().filter_map(|u| match u {
            Usage::Overrider {
                overriding,
                is_original_overrider: true,
                ..
            } => Some(*overriding),
            _ => None,
        })
    }

    fn check_hierarchy_visibility(
        &self,
        tree: &dyn SyntaxTree,
        usages: &[Usage],
        report: &mut ConflictReport,
    ) {
        let delta = self.delta;
        let target = delta.target();
        if delta.is_visibility_changed() {
            let new = delta.new_visibility();
            for base in self.search.find_super_declarations(tree, target) {
                let base_visibility = visibility_of(tree, base);
                if new.is_narrower_than(base_visibility) {
                    report.add(Conflict::declaration_warning(
                        base,
                        ConflictKind::WeakerAccess,
                        format!(
                            "'{}' would have weaker access ({new}) than '{}' in {} ({base_visibility})",
                            delta.new_name(),
                            display_name(tree, base),
                            containing_class(tree, base)
                                .map_or_else(String::new, |c| display_name(tree, c)),
                        ),
                    ));
                }
            }
        }

        let new = delta.new_visibility();
        for overrider in Self::original_overriders(usages) {
            let lost = match new {
                Visibility::Private => true,
                Visibility::Package => {
                    self.semantics.package_of(tree, overrider) != self.semantics.package_of(tree, target)
                }
                Visibility::Protected | Visibility::Public => false,
            };
            if lost && delta.is_visibility_changed() {
                report.add(Conflict::declaration_warning(
                    overrider,
                    ConflictKind::InaccessibleBase,
                    format!(
                        "'{}' in {} will no longer override the {new} '{}'",
                        display_name(tree, overrider),
                        containing_class(tree, overrider)
                            .map_or_else(String::new, |c| display_name(tree, c)),
                        delta.new_name(),
                    ),
                ));
            }
            if delta.was_vararg() {
                let last_is_array = SignatureView::read(tree, overrider)
                    .ok()
                    .and_then(|sig| sig.parameters.last().map(|p| p.type_text.ends_with("[]")))
                    .unwrap_or(false);
                if last_is_array {
                    report.add(Conflict::declaration_warning(
                        overrider,
                        ConflictKind::ImplicitVararg,
                        format!(
                            "'{}' declares an array where '{}' is variadic",
                            display_name(tree, overrider),
                            delta.old_name()
                        ),
                    ));
                }
            }
        }
    }

    fn check_call_accessibility(
        &self,
        tree: &dyn SyntaxTree,
        usages: &mut Vec<Usage>,
        report: &mut ConflictReport,
    ) {
        let delta = self.delta;
        if !delta.is_visibility_changed() {
            return;
        }
        let target = delta.target();
        let new = delta.new_visibility();
        let rewrites_anyway = delta.is_name_changed()
            || delta.is_parameter_set_or_order_changed()
            || delta.is_exception_set_or_order_changed();

        usages.retain(|usage| {
            let site = match usage {
                Usage::Call { site, referenced, .. } if *referenced == target => *site,
                Usage::PlainReference { site } | Usage::FunctionalConversion { site, .. } => *site,
                _ => return true,
            };
            if self.semantics.is_accessible(tree, target, new, site) {
                return true;
            }
            report.add(Conflict::usage_warning(
                site,
                ConflictKind::InaccessibleCall,
                format!(
                    "'{}' with {new} visibility will not be accessible from {}",
                    delta.new_name(),
                    containing_class(tree, site).map_or_else(String::new, |c| display_name(tree, c)),
                ),
            ));
            rewrites_anyway
        });
    }

    fn check_removed_parameters(&self, tree: &dyn SyntaxTree, usages: &[Usage], report: &mut ConflictReport) {
        let delta = self.delta;
        let declarations = std::iter::once(delta.target()).chain(Self::original_overriders(usages));
        for decl in declarations {
            let Some(body) = tree.child_of_kind(decl, NodeKind::Block) else {
                continue;
            };
            let names: Vec<String> = if decl == delta.target() {
                (0..delta.to_remove().len())
                    .map(|i| delta.old_parameter_name(i).unwrap_or_default().to_string())
                    .collect()
            } else {
                SignatureView::read(tree, decl)
                    .map(|sig| sig.parameters.into_iter().map(|p| p.name).collect())
                    .unwrap_or_default()
            };
            let references: Vec<NodeId> = tree
                .descendants(body)
                .into_iter()
                .filter(|n| tree.kind(*n) == NodeKind::Reference && tree.children(*n).is_empty())
                .collect();

            for (index, removed) in delta.to_remove().iter().enumerate() {
                let Some(name) = names.get(index).filter(|n| *removed && !n.is_empty()) else {
                    continue;
                };
                let used = references
                    .iter()
                    .any(|r| tree.text(*r) == name.as_str() && !self.is_forwarded(tree, *r, index));
                if used {
                    report.add(Conflict::declaration_warning(
                        decl,
                        ConflictKind::ParameterStillUsed,
                        format!(
                            "parameter '{name}' is used in the body of '{}' and will be removed",
                            display_name(tree, decl)
                        ),
                    ));
                }
            }
        }
    }

    /// Reference passed unchanged at the same position to the overridden or chained declaration
    fn is_forwarded(&self, tree: &dyn SyntaxTree, reference: NodeId, index: usize) -> bool {
        let Some(list) = tree.parent(reference) else {
            return false;
        };
        if tree.kind(list) != NodeKind::ArgumentList || tree.child_index(reference) != Some(index) {
            return false;
        }
        let Some(shape) = tree.parent(list).and_then(|c| CallShape::read(tree, c)) else {
            return false;
        };
        if tree.kind(shape.call) != NodeKind::Call {
            return false;
        }
        let super_call = shape.callee_name(tree) == Some(self.delta.old_name())
            && shape
                .qualifier(tree)
                .is_some_and(|q| tree.text(q) == "super");
        (shape.is_chaining(tree) || super_call) && Self::is_leading_statement(tree, shape.call)
    }

    /// Whether `node` sits in the first statement of its declaration's body
    fn is_leading_statement(tree: &dyn SyntaxTree, node: NodeId) -> bool {
        let Some(statement) = sigprop_tree::enclosing_statement(tree, node) else {
            return false;
        };
        let in_body = tree
            .parent(statement)
            .and_then(|block| tree.parent(block))
            .is_some_and(|decl| tree.kind(decl).is_declaration());
        in_body && tree.child_index(statement) == Some(0)
    }

    fn check_signature_collision(&self, tree: &dyn SyntaxTree, report: &mut ConflictReport) {
        let delta = self.delta;
        if !(delta.is_name_changed()
            || delta.is_parameter_set_or_order_changed()
            || delta.is_parameter_types_changed())
        {
            return;
        }
        let target = delta.target();
        let Some(class) = containing_class(tree, target) else {
            return;
        };
        let erase = |t: &str| self.semantics.erasure(&t.replace("...", "[]"));
        let wanted: Vec<String> = delta
            .parameters()
            .iter()
            .map(|p| erase(p.type_text()))
            .collect();

        for member in tree.children(class) {
            if tree.kind(member) != tree.kind(target) {
                continue;
            }
            if member == target && !delta.generate_delegate() {
                continue;
            }
            let Ok(sig) = SignatureView::read(tree, member) else {
                continue;
            };
            let types: Vec<String> = sig.parameters.iter().map(|p| erase(&p.type_text)).collect();
            if sig.name == delta.new_name() && types == wanted {
                report.add(Conflict::blocking(
                    member,
                    ConflictKind::SignatureCollision,
                    format!(
                        "'{}({})' is already defined in {}",
                        sig.name,
                        types.join(", "),
                        display_name(tree, class)
                    ),
                ));
            }
        }
    }

    fn check_contracts(&self, tree: &dyn SyntaxTree, usages: &[Usage], report: &mut ConflictReport) {
        let delta = self.delta;
        if !delta.is_parameter_set_or_order_changed() {
            return;
        }
        let declarations = std::iter::once(delta.target()).chain(Self::original_overriders(usages));
        for decl in declarations {
            let Some(contract) = tree.child_of_kind(decl, NodeKind::Contract) else {
                continue;
            };
            if let Err(reason) = reindex_contract(tree.text(contract), delta) {
                let reason = format!(
                    "contract of '{}' cannot be converted: {reason}",
                    display_name(tree, decl)
                );
                let conflict = if decl == delta.target() {
                    Conflict::blocking(decl, ConflictKind::ContractNotConvertible, reason)
                } else {
                    Conflict::declaration_warning(decl, ConflictKind::ContractNotConvertible, reason)
                };
                report.add(conflict);
            }
        }
    }

    fn check_local_collisions(&self, tree: &dyn SyntaxTree, report: &mut ConflictReport) {
        let delta = self.delta;
        let target = delta.target();
        let Ok(shape) = DeclarationShape::read(tree, target) else {
            return;
        };
        let Some(body) = shape.body else {
            return;
        };
        let locals: IndexSet<String> = tree
            .descendants(body)
            .into_iter()
            .filter(|n| tree.kind(*n) == NodeKind::LocalVar)
            .map(|n| sigprop_tree::variable_parts(tree, n).1.to_string())
            .collect();

        for p in delta.parameters() {
            let renamed = p
                .old_index()
                .and_then(|i| delta.old_parameter_name(i))
                .map_or(true, |old| old != p.name());
            if renamed && locals.contains(p.name()) {
                report.add(Conflict::declaration_warning(
                    target,
                    ConflictKind::LocalNameCollision,
                    format!(
                        "there is already a variable '{}' in '{}'",
                        p.name(),
                        delta.old_name()
                    ),
                ));
            }
        }
    }

    fn check_usage_shapes(&self, tree: &dyn SyntaxTree, usages: &[Usage], report: &mut ConflictReport) {
        let delta = self.delta;
        let target = delta.target();
        let new_checked: Vec<&str> = delta
            .added_exceptions()
            .into_iter()
            .map(|e| e.type_text())
            .filter(|t| self.semantics.is_checked_exception(t))
            .collect();

        for usage in usages {
            match usage {
                Usage::FunctionalConversion { site, .. } if tree.kind(*site) == NodeKind::MethodRef => {
                    report.add(Conflict::usage_warning(
                        *site,
                        ConflictKind::MethodReferenceExpansion,
                        format!(
                            "method reference '{}' will be converted to a lambda",
                            tree.text(*site)
                        ),
                    ));
                }
                Usage::Call {
                    site,
                    referenced,
                    to_change_arguments,
                    to_catch_exceptions,
                    ..
                } => {
                    let Some(shape) = CallShape::read(tree, *site) else {
                        continue;
                    };
                    if *to_change_arguments && *referenced == target {
                        let args = tree.children(shape.arguments);
                        for (i, removed) in delta.to_remove().iter().enumerate() {
                            let Some(arg) = args.get(i).filter(|_| *removed) else {
                                continue;
                            };
                            if tree.kind(*arg).has_side_effects() {
                                report.add(Conflict::usage_warning(
                                    *site,
                                    ConflictKind::SideEffectRemoved,
                                    format!(
                                        "argument '{}' has side effects and will be removed",
                                        sigprop_tree::render(tree, *arg)
                                    ),
                                ));
                            }
                        }
                    }
                    if !*to_catch_exceptions && shape.is_chaining(tree) && !new_checked.is_empty() {
                        self.check_chaining_exceptions(tree, *site, &new_checked, report);
                    }
                    if *to_catch_exceptions && *referenced == target && !new_checked.is_empty() {
                        let reconciler = ExceptionReconciler::new(self.semantics, self.config);
                        for exception in reconciler.unwrappable(tree, *site, &new_checked) {
                            report.add(Conflict::usage_warning(
                                *site,
                                ConflictKind::UnhandledException,
                                format!(
                                    "unhandled exception '{exception}' in initializer of {}",
                                    containing_class(tree, *site)
                                        .map_or_else(String::new, |c| display_name(tree, c)),
                                ),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn check_chaining_exceptions(
        &self,
        tree: &dyn SyntaxTree,
        site: NodeId,
        new_checked: &[&str],
        report: &mut ConflictReport,
    ) {
        let Some(ctor) = sigprop_tree::enclosing_declaration(tree, site) else {
            return;
        };
        if self.delta.receives_exceptions(ctor) {
            return;
        }
        let declared: Vec<String> = tree
            .child_of_kind(ctor, NodeKind::ThrowsList)
            .map(|t| tree.children(t).into_iter().map(|e| tree.text(e).to_string()).collect())
            .unwrap_or_default();
        for exception in new_checked {
            if !declared.iter().any(|d| self.semantics.is_subtype(exception, d)) {
                report.add(Conflict::usage_warning(
                    site,
                    ConflictKind::UnhandledException,
                    format!(
                        "unhandled exception '{exception}' in constructor of {}",
                        containing_class(tree, ctor).map_or_else(String::new, |c| display_name(tree, c)),
                    ),
                ));
            }
        }
    }
}
