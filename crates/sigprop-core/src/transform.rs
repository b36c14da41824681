//! Usage transformation
//!
//! Provides [`UsageTransformer`], which applies the classified usages in a
//! fixed order: declaration usages and functional conversions first, then
//! the target declaration itself, then every reference site.

use crate::binder::{ArgumentBinder, BindMode, BindNote, DefaultValues};
use crate::config::EngineConfig;
use crate::conflict::{Conflict, ConflictKind, ConflictReport};
use crate::declaration::{insert_super_call, DeclarationRewriter};
use crate::error::EngineError;
use crate::exceptions::ExceptionReconciler;
use crate::host::SemanticModel;
use crate::outcome::FlaggedSite;
use crate::scope::{unique_name, visible_variables};
use crate::usage::Usage;
use indexmap::IndexSet;
use sigprop_delta::SignatureDelta;
use sigprop_reconcile::synchronize_list;
use sigprop_tree::{
    enclosing_declaration, factory, variable_parts, CallShape, NodeId, NodeKind, SignatureView,
    SyntaxTree,
};
use std::collections::HashSet;

/// What one apply pass did
#[derive(Debug, Clone, Default)]
pub struct TransformSummary {
    /// Usages applied
    pub applied: usize,

    /// Call sites left with unresolved arguments
    pub flagged: Vec<FlaggedSite>,

    /// Conflicts discovered while binding
    pub report: ConflictReport,
}

/// Declarations whose calls are handled specially, derived from the usages
#[derive(Debug, Default)]
struct Roles {
    /// Target plus its original overriders
    family: IndexSet<NodeId>,
    /// Declarations receiving the new parameters themselves
    forwarding: IndexSet<NodeId>,
}

impl Roles {
    fn collect(delta: &SignatureDelta, usages: &[Usage]) -> Self {
        let mut roles = Self::default();
        roles.family.insert(delta.target());
        for usage in usages {
            match usage {
                Usage::Overrider {
                    overriding,
                    is_original_overrider: true,
                    ..
                } => {
                    roles.family.insert(*overriding);
                }
                Usage::Overrider {
                    overriding,
                    modify_args: true,
                    ..
                } => {
                    roles.forwarding.insert(*overriding);
                }
                Usage::CallerPropagation {
                    caller,
                    insert_params: true,
                    ..
                } => {
                    roles.forwarding.insert(*caller);
                }
                _ => {}
            }
        }
        roles
    }
}

/// Applies usages and the declaration change to a tree
pub struct UsageTransformer<'a> {
    delta: &'a SignatureDelta,
    semantics: &'a dyn SemanticModel,
    config: &'a EngineConfig,
    defaults: &'a DefaultValues,
}

impl<'a> UsageTransformer<'a> {
    /// Create transformer
    #[must_use]
    pub fn new(
        delta: &'a SignatureDelta,
        semantics: &'a dyn SemanticModel,
        config: &'a EngineConfig,
        defaults: &'a DefaultValues,
    ) -> Self {
        Self {
            delta,
            semantics,
            config,
            defaults,
        }
    }

    /// Apply every usage and the declaration change
    ///
    /// # Errors
    /// Returns error on the first edit the tree refuses; the caller is
    /// expected to roll back.
    pub fn apply(&self, tree: &mut dyn SyntaxTree, usages: &[Usage]) -> Result<TransformSummary, EngineError> {
        let delta = self.delta;
        let roles = Roles::collect(delta, usages);
        let rewriter = DeclarationRewriter::new(delta, self.semantics, self.defaults);
        let mut summary = TransformSummary::default();
        let mut materialized = Vec::new();
        let mut pending_ctors = Vec::new();

        for usage in usages.iter().filter(|u| u.is_before_phase()) {
            tracing::debug!("before: {} at {}", usage.kind_name(), usage.site());
            self.apply_usage(tree, &rewriter, &roles, usage, &mut materialized, &mut pending_ctors, &mut summary)?;
            summary.applied += 1;
        }

        if delta.generate_delegate() {
            rewriter.generate_delegate(tree, delta.target())?;
        }
        rewriter.rewrite(tree, delta.target())?;

        let after: Vec<Usage> = usages
            .iter()
            .filter(|u| !u.is_before_phase())
            .cloned()
            .chain(materialized.drain(..))
            .collect();
        for usage in &after {
            tracing::debug!("after: {} at {}", usage.kind_name(), usage.site());
            self.apply_usage(tree, &rewriter, &roles, usage, &mut materialized, &mut pending_ctors, &mut summary)?;
            summary.applied += 1;
        }

        for ctor in pending_ctors {
            let call = insert_super_call(tree, ctor)?;
            self.bind(tree, call, BindMode { insert_defaults: true, append_only: false }, &mut summary)?;
        }
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_usage(
        &self,
        tree: &mut dyn SyntaxTree,
        rewriter: &DeclarationRewriter<'_>,
        roles: &Roles,
        usage: &Usage,
        materialized: &mut Vec<Usage>,
        pending_ctors: &mut Vec<NodeId>,
        summary: &mut TransformSummary,
    ) -> Result<(), EngineError> {
        let delta = self.delta;
        match usage {
            Usage::CallerPropagation {
                caller,
                insert_params,
                insert_throws,
            } => rewriter.propagate_into(tree, *caller, *insert_params, *insert_throws)?,
            Usage::Overrider {
                overriding,
                is_original_overrider: true,
                ..
            } => rewriter.rewrite(tree, *overriding)?,
            Usage::Overrider {
                overriding,
                modify_args,
                modify_exceptions,
                ..
            } => rewriter.propagate_into(tree, *overriding, *modify_args, *modify_exceptions)?,
            Usage::MissingConstructor { owning_class } => {
                pending_ctors.push(rewriter.add_missing_constructor(tree, *owning_class)?);
            }
            Usage::FunctionalConversion {
                site,
                interface_method,
            } => match tree.kind(*site) {
                NodeKind::MethodRef => {
                    let call = self.expand_method_reference(tree, *site, *interface_method)?;
                    materialized.push(Usage::Call {
                        site: call,
                        referenced: delta.target(),
                        to_change_arguments: true,
                        to_catch_exceptions: delta.is_exception_set_or_order_changed(),
                        is_vararg_call: delta.was_vararg(),
                    });
                }
                NodeKind::Lambda => self.reshape_lambda(tree, *site)?,
                other => tracing::warn!("cannot convert {:?} site {}", other, site),
            },
            Usage::Call {
                site,
                referenced,
                to_change_arguments,
                to_catch_exceptions,
                ..
            } => {
                let in_family = roles.family.contains(referenced);
                if in_family && delta.is_name_changed() {
                    if let Some(reference) = CallShape::read(&*tree, *site).and_then(|s| s.reference) {
                        if tree.text(reference) == delta.old_name() {
                            tree.set_text(reference, delta.new_name())?;
                        }
                    }
                }
                if *to_change_arguments {
                    let mode = BindMode {
                        insert_defaults: self.needs_default_value(&*tree, roles, *site),
                        append_only: !in_family,
                    };
                    self.bind(tree, *site, mode, summary)?;
                }
                if *to_catch_exceptions {
                    let thrown: Vec<String> = if *referenced == delta.target() {
                        delta.new_exception_types().into_iter().map(str::to_string).collect()
                    } else {
                        SignatureView::read(&*tree, *referenced)
                            .map(|s| s.exceptions)
                            .unwrap_or_default()
                    };
                    let fix = ExceptionReconciler::new(self.semantics, self.config).fix_call_site(tree, *site, &thrown)?;
                    if fix.unhandled > 0 {
                        summary.flagged.push(FlaggedSite {
                            site: *site,
                            reason: format!("{} checked exceptions left unhandled", fix.unhandled),
                        });
                    }
                }
            }
            Usage::ConstructorImplicit { implicit_ctor, .. } => {
                let call = insert_super_call(tree, *implicit_ctor)?;
                self.bind(tree, call, BindMode { insert_defaults: true, append_only: false }, summary)?;
            }
            Usage::PlainReference { site } => {
                let text = tree.text(*site).to_string();
                let renamed = match tree.kind(*site) {
                    NodeKind::MethodRef => text
                        .strip_suffix(delta.old_name())
                        .filter(|q| q.ends_with("::"))
                        .map(|q| format!("{q}{}", delta.new_name())),
                    _ => (text == delta.old_name()).then(|| delta.new_name().to_string()),
                };
                if let Some(renamed) = renamed {
                    tree.set_text(*site, &renamed)?;
                }
            }
            Usage::ComponentDeclaration {
                site,
                new_name,
                new_type,
            } => {
                if let Some(name) = tree.child_of_kind(*site, NodeKind::Name) {
                    tree.set_text(name, new_name)?;
                }
                if let Some(ty) = tree.child_of_kind(*site, NodeKind::TypeRef) {
                    tree.set_text(ty, new_type)?;
                }
            }
            Usage::ParameterRename {
                site,
                old_name,
                new_name,
            } => {
                if tree.text(*site) == old_name {
                    tree.set_text(*site, new_name)?;
                }
            }
        }
        Ok(())
    }

    /// Whether new arguments at `call` get default values rather than forwarded names
    fn needs_default_value(&self, tree: &dyn SyntaxTree, roles: &Roles, call: NodeId) -> bool {
        let Some(enclosing) = enclosing_declaration(tree, call) else {
            return true;
        };
        if roles.forwarding.contains(&enclosing) {
            return false;
        }
        // `super.m(...)` inside an overrider that got the new parameters.
        let super_call = CallShape::read(tree, call)
            .and_then(|s| s.qualifier(tree))
            .is_some_and(|q| tree.text(q) == "super");
        !(super_call && enclosing != self.delta.target() && roles.family.contains(&enclosing))
    }

    fn bind(
        &self,
        tree: &mut dyn SyntaxTree,
        call: NodeId,
        mode: BindMode,
        summary: &mut TransformSummary,
    ) -> Result<(), EngineError> {
        let notes = ArgumentBinder::new(self.delta, self.semantics, self.defaults).bind(tree, call, mode)?;
        for note in notes {
            let (kind, reason) = match &note {
                BindNote::Ambiguous { parameter } => (
                    ConflictKind::AmbiguousDefault,
                    format!("several variables could supply '{parameter}'"),
                ),
                BindNote::Missing { parameter } => (
                    ConflictKind::MissingDefault,
                    format!("no value for new parameter '{parameter}'"),
                ),
            };
            tracing::warn!("flagged {}: {}", call, reason);
            summary.report.add(Conflict::usage_warning(call, kind, reason.clone()));
            summary.flagged.push(FlaggedSite { site: call, reason });
        }
        Ok(())
    }

    /// Replace `Q::name` with `(p..) -> Q.name(p..)`; returns the new call
    ///
    /// When `Q` names a type and the method is an instance method, the
    /// first lambda parameter is the receiver: `(q, p..) -> q.name(p..)`.
    fn expand_method_reference(
        &self,
        tree: &mut dyn SyntaxTree,
        site: NodeId,
        interface_method: Option<NodeId>,
    ) -> Result<NodeId, EngineError> {
        let text = tree.text(site).to_string();
        let (qualifier, member) = text
            .rsplit_once("::")
            .ok_or_else(|| EngineError::invalid_target(site, format!("'{text}' is not a method reference")))?;
        let referenced = self
            .semantics
            .resolve_reference(&*tree, site)
            .unwrap_or_else(|| self.delta.target());
        let unbound = member != "new" && names_type(qualifier) && !is_static(&*tree, referenced);

        let mut base_names: Vec<String> = match interface_method.and_then(|m| SignatureView::read(&*tree, m).ok()) {
            Some(signature) => signature.parameters.into_iter().map(|p| p.name).collect(),
            None => {
                let receiver = unbound.then(|| receiver_name(qualifier));
                receiver
                    .into_iter()
                    .chain(self.delta.old_signature().parameters.iter().map(|p| p.name.clone()))
                    .collect()
            }
        };
        if unbound && base_names.is_empty() {
            base_names.push(receiver_name(qualifier));
        }
        let mut taken: HashSet<String> = visible_variables(&*tree, self.semantics, site)
            .into_iter()
            .map(|v| v.name)
            .collect();
        let names: Vec<String> = base_names
            .iter()
            .map(|base| {
                let name = unique_name(base, &taken);
                taken.insert(name.clone());
                name
            })
            .collect();

        let params = tree.create(NodeKind::ParameterList, "");
        let mut args = Vec::with_capacity(names.len());
        for name in &names {
            let p = factory::parameter(tree, "", name)?;
            tree.append(params, p)?;
            args.push(factory::reference(tree, None, name)?);
        }

        let call = if member == "new" {
            let ty = tree.create(NodeKind::TypeRef, qualifier);
            let list = factory::node(tree, NodeKind::ArgumentList, "", &args)?;
            factory::node(tree, NodeKind::New, "", &[ty, list])?
        } else if let Some((receiver, rest)) = args.split_first().filter(|_| unbound) {
            let callee = factory::reference(tree, Some(*receiver), member)?;
            factory::call(tree, callee, rest)?
        } else {
            let q = factory::expression(tree, qualifier);
            let callee = factory::reference(tree, Some(q), member)?;
            factory::call(tree, callee, &args)?
        };
        let lambda = factory::node(tree, NodeKind::Lambda, "", &[params, call])?;
        tree.replace(site, lambda)?;
        tracing::debug!("expanded method reference {} into lambda {}", site, lambda);
        Ok(call)
    }

    /// Make a lambda implementing the target take the new parameter list
    fn reshape_lambda(&self, tree: &mut dyn SyntaxTree, lambda: NodeId) -> Result<(), EngineError> {
        let delta = self.delta;
        let Some(list) = tree.child_of_kind(lambda, NodeKind::ParameterList) else {
            return Ok(());
        };
        let old = tree.children_of_kind(list, NodeKind::Parameter);
        let typed = old.iter().any(|p| !variable_parts(&*tree, *p).0.is_empty());
        let mut taken: HashSet<String> = old
            .iter()
            .map(|p| variable_parts(&*tree, *p).1.to_string())
            .collect();

        let mut desired = Vec::with_capacity(delta.parameters().len());
        for p in delta.parameters() {
            match p.old_index().and_then(|i| old.get(i)) {
                Some(existing) => desired.push(Some(*existing)),
                None => {
                    let name = unique_name(p.name(), &taken);
                    taken.insert(name.clone());
                    let type_text = if typed { p.type_text() } else { "" };
                    desired.push(Some(factory::parameter(tree, type_text, &name)?));
                }
            }
        }
        synchronize_list(tree, list, &desired, delta.to_remove())?;
        Ok(())
    }
}

/// Qualifier of a method reference names a type rather than an expression
fn names_type(qualifier: &str) -> bool {
    let simple = qualifier.rsplit('.').next().unwrap_or(qualifier);
    !matches!(simple, "this" | "super") && simple.starts_with(|c: char| c.is_ascii_uppercase())
}

fn is_static(tree: &dyn SyntaxTree, decl: NodeId) -> bool {
    tree.child_of_kind(decl, NodeKind::Modifiers)
        .is_some_and(|m| tree.text(m).split_whitespace().any(|w| w == "static"))
}

/// Lambda parameter standing for the receiver of an unbound reference
fn receiver_name(qualifier: &str) -> String {
    let simple = qualifier.rsplit('.').next().unwrap_or(qualifier);
    let simple = simple.split('<').next().unwrap_or(simple);
    let mut chars = simple.chars();
    chars.next().map_or_else(
        || "receiver".to_string(),
        |first| first.to_lowercase().chain(chars).collect(),
    )
}
