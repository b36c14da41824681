//! Usage classification
//!
//! Provides [`UsageClassifier`], which turns the host's raw search results
//! into [`Usage`]s. Classification is read-only; sites that fit no variant
//! are skipped.

use crate::host::{RawUsage, SearchProvider, SemanticModel};
use crate::scope::has_explicit_chaining;
use crate::usage::Usage;
use indexmap::IndexMap;
use sigprop_delta::SignatureDelta;
use sigprop_tree::{
    constructors_of, containing_class, enclosing_declaration, variable_parts, CallShape,
    NodeId, NodeKind, SignatureView, SyntaxTree,
};

/// Maps raw references to usages
pub struct UsageClassifier<'a> {
    delta: &'a SignatureDelta,
    search: &'a dyn SearchProvider,
    semantics: &'a dyn SemanticModel,
}

/// What the usages of one referenced declaration must receive
#[derive(Debug, Clone, Copy)]
struct Demand {
    referenced: NodeId,
    modify_args: bool,
    throw_exceptions: bool,
}

impl<'a> UsageClassifier<'a> {
    /// Create classifier
    #[must_use]
    pub fn new(
        delta: &'a SignatureDelta,
        search: &'a dyn SearchProvider,
        semantics: &'a dyn SemanticModel,
    ) -> Self {
        Self {
            delta,
            search,
            semantics,
        }
    }

    /// Collect every usage of the change, one per site
    #[must_use]
    pub fn classify(&self, tree: &dyn SyntaxTree) -> Vec<Usage> {
        let delta = self.delta;
        let target = delta.target();
        let mut out: IndexMap<NodeId, Usage> = IndexMap::new();
        let rewrite_calls = delta.needs_call_rewrite();

        let overriders = self.search.find_overriders(tree, target);
        for overriding in &overriders {
            push(
                &mut out,
                Usage::Overrider {
                    overriding: *overriding,
                    base: target,
                    is_original_overrider: true,
                    modify_args: true,
                    modify_exceptions: true,
                },
            );
        }

        if rewrite_calls {
            for referenced in std::iter::once(target).chain(overriders.iter().copied()) {
                let demand = Demand {
                    referenced,
                    modify_args: true,
                    throw_exceptions: true,
                };
                for raw in self.search.find_usages(tree, referenced) {
                    self.classify_reference(tree, raw, demand, &mut out);
                }
            }
        } else if delta.is_name_changed() {
            // A delegate keeps the old name callable; only non-call references move.
            for raw in self.search.find_usages(tree, target) {
                if tree.kind(raw.site) == NodeKind::Reference {
                    push(&mut out, Usage::PlainReference { site: raw.site });
                }
            }
        }

        for (caller, propagation) in delta.propagate_to_callers() {
            push(
                &mut out,
                Usage::CallerPropagation {
                    caller: *caller,
                    insert_params: propagation.parameters,
                    insert_throws: propagation.exceptions,
                },
            );
            for overriding in self.search.find_overriders(tree, *caller) {
                push(
                    &mut out,
                    Usage::Overrider {
                        overriding,
                        base: *caller,
                        is_original_overrider: false,
                        modify_args: propagation.parameters,
                        modify_exceptions: propagation.exceptions,
                    },
                );
            }
            if rewrite_calls {
                let demand = Demand {
                    referenced: *caller,
                    modify_args: propagation.parameters,
                    throw_exceptions: propagation.exceptions,
                };
                for raw in self.search.find_usages(tree, *caller) {
                    self.classify_reference(tree, raw, demand, &mut out);
                }
            }
        }

        for overriding in delta.propagate_to_overriders() {
            push(
                &mut out,
                Usage::Overrider {
                    overriding: *overriding,
                    base: target,
                    is_original_overrider: false,
                    modify_args: true,
                    modify_exceptions: true,
                },
            );
        }

        self.collect_parameter_renames(tree, &overriders, &mut out);

        tracing::debug!("classified {} usages of {}", out.len(), target);
        out.into_values().collect()
    }

    fn classify_reference(
        &self,
        tree: &dyn SyntaxTree,
        raw: RawUsage,
        demand: Demand,
        out: &mut IndexMap<NodeId, Usage>,
    ) {
        let site = raw.site;
        let usage = match tree.kind(site) {
            NodeKind::Call | NodeKind::New => self.call_usage(tree, site, demand),
            NodeKind::MethodRef => self.method_reference_usage(tree, site, demand),
            NodeKind::Lambda if self.delta.is_parameter_set_or_order_changed() => {
                Some(Usage::FunctionalConversion {
                    site,
                    interface_method: Some(demand.referenced),
                })
            }
            NodeKind::Reference => Some(Usage::PlainReference { site }),
            NodeKind::Constructor if !has_explicit_chaining(tree, site) => {
                containing_class(tree, site).map(|owning_class| Usage::ConstructorImplicit {
                    implicit_ctor: site,
                    owning_class,
                })
            }
            NodeKind::Class => self.class_usage(tree, site, demand),
            NodeKind::Field => self.component_usage(tree, site),
            _ => None,
        };
        match usage {
            Some(usage) => push(out, usage),
            None => tracing::debug!(
                "skipping {:?} site {} resolved to {}",
                tree.kind(site),
                site,
                raw.resolved
            ),
        }
    }

    fn call_usage(&self, tree: &dyn SyntaxTree, site: NodeId, demand: Demand) -> Option<Usage> {
        let delta = self.delta;
        let shape = CallShape::read(tree, site)?;
        let enclosing = enclosing_declaration(tree, site);
        let exceptions_changed = delta.is_exception_set_or_order_changed()
            && !enclosing.is_some_and(|d| delta.receives_exceptions(d));
        let to_catch_exceptions =
            demand.throw_exceptions && exceptions_changed && !shape.is_chaining(tree);

        let signature = if demand.referenced == delta.target() {
            Some(delta.old_signature().clone())
        } else {
            SignatureView::read(tree, demand.referenced).ok()
        };
        let is_vararg_call = signature.as_ref().is_some_and(SignatureView::is_vararg);
        let param_count = signature.as_ref().map_or(0, |s| s.parameters.len());
        let arg_count = tree.children(shape.arguments).len();

        if !to_catch_exceptions && !is_vararg_call && arg_count != param_count {
            tracing::debug!(
                "call {} passes {} arguments to {} parameters, skipping",
                site,
                arg_count,
                param_count
            );
            return None;
        }

        Some(Usage::Call {
            site,
            referenced: demand.referenced,
            to_change_arguments: demand.modify_args && (is_vararg_call || arg_count == param_count),
            to_catch_exceptions,
            is_vararg_call,
        })
    }

    fn method_reference_usage(
        &self,
        tree: &dyn SyntaxTree,
        site: NodeId,
        demand: Demand,
    ) -> Option<Usage> {
        let delta = self.delta;
        if demand.referenced == delta.target() && delta.is_parameter_set_or_order_changed() {
            Some(Usage::FunctionalConversion {
                site,
                interface_method: self.semantics.functional_method(tree, site),
            })
        } else if delta.is_name_changed() {
            Some(Usage::PlainReference { site })
        } else {
            None
        }
    }

    fn class_usage(&self, tree: &dyn SyntaxTree, class: NodeId, demand: Demand) -> Option<Usage> {
        if tree.text(class).is_empty() {
            // Anonymous subclass: the creation expression carries the arguments.
            let creation = tree.parent(class).filter(|p| tree.kind(*p) == NodeKind::New)?;
            return self.call_usage(tree, creation, demand);
        }
        if constructors_of(tree, class).is_empty() {
            Some(Usage::MissingConstructor {
                owning_class: class,
            })
        } else {
            None
        }
    }

    fn component_usage(&self, tree: &dyn SyntaxTree, field: NodeId) -> Option<Usage> {
        let delta = self.delta;
        if !delta.old_signature().is_constructor() {
            return None;
        }
        let (_, field_name) = variable_parts(tree, field);
        let old_index = delta
            .old_signature()
            .parameters
            .iter()
            .position(|p| p.name == field_name)?;
        let parameter = delta
            .parameters()
            .iter()
            .find(|p| p.old_index() == Some(old_index))?;
        let old = &delta.old_signature().parameters[old_index];
        if old.name == parameter.name() && old.type_text == parameter.type_text() {
            return None;
        }
        Some(Usage::ComponentDeclaration {
            site: field,
            new_name: parameter.name().to_string(),
            new_type: parameter.type_text().to_string(),
        })
    }

    fn collect_parameter_renames(
        &self,
        tree: &dyn SyntaxTree,
        overriders: &[NodeId],
        out: &mut IndexMap<NodeId, Usage>,
    ) {
        let delta = self.delta;
        if !delta.is_parameter_names_changed() {
            return;
        }
        for decl in std::iter::once(delta.target()).chain(overriders.iter().copied()) {
            let Some(body) = tree.child_of_kind(decl, NodeKind::Block) else {
                continue;
            };
            let Ok(signature) = SignatureView::read(tree, decl) else {
                continue;
            };
            for p in delta.parameters() {
                let Some(old_index) = p.old_index() else {
                    continue;
                };
                let (Some(old_name), Some(own)) = (
                    delta.old_parameter_name(old_index),
                    signature.parameters.get(old_index),
                ) else {
                    continue;
                };
                // Overriders are only renamed when they use the base name.
                if old_name == p.name() || own.name != old_name {
                    continue;
                }
                for node in tree.descendants(body) {
                    if tree.kind(node) == NodeKind::Reference
                        && tree.children(node).is_empty()
                        && tree.text(node) == old_name
                    {
                        push(
                            out,
                            Usage::ParameterRename {
                                site: node,
                                old_name: old_name.to_string(),
                                new_name: p.name().to_string(),
                            },
                        );
                    }
                }
            }
        }
    }
}

fn push(out: &mut IndexMap<NodeId, Usage>, usage: Usage) {
    out.entry(usage.site()).or_insert(usage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sigprop_delta::DeltaBuilder;
    use sigprop_tree::{factory, MemoryTree};

    /// Search results fixed up front
    #[derive(Default)]
    struct Scripted {
        usages: Vec<RawUsage>,
        overriders: Vec<NodeId>,
    }

    impl SearchProvider for Scripted {
        fn find_usages(&self, _tree: &dyn SyntaxTree, declaration: NodeId) -> Vec<RawUsage> {
            self.usages.iter().copied().filter(|u| u.resolved == declaration).collect()
        }

        fn find_overriders(&self, _tree: &dyn SyntaxTree, _declaration: NodeId) -> Vec<NodeId> {
            self.overriders.clone()
        }

        fn find_super_declarations(&self, _tree: &dyn SyntaxTree, _declaration: NodeId) -> Vec<NodeId> {
            Vec::new()
        }
    }

    impl SemanticModel for Scripted {
        fn is_subtype(&self, sub: &str, sup: &str) -> bool {
            sub == sup
        }

        fn is_checked_exception(&self, _type_text: &str) -> bool {
            true
        }

        fn resolve_reference(&self, _tree: &dyn SyntaxTree, _site: NodeId) -> Option<NodeId> {
            None
        }
    }

    fn with_two_parameters(tree: &mut MemoryTree, decl: NodeId) -> NodeId {
        let list = tree.child_of_kind(decl, NodeKind::ParameterList).unwrap();
        for name in ["a", "b"] {
            let p = factory::parameter(tree, "int", name).unwrap();
            tree.append(list, p).unwrap();
        }
        decl
    }

    /// `void <name>(int a, int b) { }`
    fn method(tree: &mut MemoryTree, name: &str) -> NodeId {
        let mods = tree.create(NodeKind::Modifiers, "");
        let ret = tree.create(NodeKind::TypeRef, "void");
        let n = tree.create(NodeKind::Name, name);
        let list = tree.create(NodeKind::ParameterList, "");
        let throws = tree.create(NodeKind::ThrowsList, "");
        let body = factory::block(tree, &[]).unwrap();
        let m = factory::node(tree, NodeKind::Method, "", &[mods, ret, n, list, throws, body]).unwrap();
        with_two_parameters(tree, m)
    }

    fn call(tree: &mut MemoryTree, callee: &str, args: &[&str]) -> NodeId {
        let callee = factory::reference(tree, None, callee).unwrap();
        let args: Vec<NodeId> = args.iter().map(|a| factory::expression(tree, a)).collect();
        factory::call(tree, callee, &args).unwrap()
    }

    fn call_sites(usages: &[Usage]) -> Vec<NodeId> {
        usages
            .iter()
            .filter(|u| matches!(u, Usage::Call { .. }))
            .map(Usage::site)
            .collect()
    }

    #[test]
    fn test_call_with_wrong_argument_count_is_skipped() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, "m");
        let short = call(&mut tree, "m", &["1"]);
        let full = call(&mut tree, "m", &["1", "2"]);
        let search = Scripted {
            usages: vec![RawUsage::new(short, m), RawUsage::new(full, m)],
            ..Scripted::default()
        };
        let delta = DeltaBuilder::for_declaration(&tree, m).unwrap().name("n").build().unwrap();

        let usages = UsageClassifier::new(&delta, &search, &search).classify(&tree);

        assert_eq!(call_sites(&usages), vec![full]);
    }

    #[test]
    fn test_chaining_call_does_not_catch_new_exceptions() {
        let mut tree = MemoryTree::new();
        let ctor = factory::constructor(&mut tree, "public", "Base").unwrap();
        let ctor = with_two_parameters(&mut tree, ctor);
        let chained = call(&mut tree, "super", &["1", "2"]);
        let ty = tree.create(NodeKind::TypeRef, "Base");
        let one = factory::expression(&mut tree, "1");
        let two = factory::expression(&mut tree, "2");
        let args = factory::node(&mut tree, NodeKind::ArgumentList, "", &[one, two]).unwrap();
        let created = factory::node(&mut tree, NodeKind::New, "", &[ty, args]).unwrap();
        let search = Scripted {
            usages: vec![RawUsage::new(chained, ctor), RawUsage::new(created, ctor)],
            ..Scripted::default()
        };
        let delta = DeltaBuilder::for_declaration(&tree, ctor)
            .unwrap()
            .add_exception("IOException")
            .build()
            .unwrap();

        let usages = UsageClassifier::new(&delta, &search, &search).classify(&tree);

        let catches: Vec<(NodeId, bool)> = usages
            .iter()
            .filter_map(|u| match u {
                Usage::Call {
                    site,
                    to_catch_exceptions,
                    ..
                } => Some((*site, *to_catch_exceptions)),
                _ => None,
            })
            .collect();
        assert_eq!(catches, vec![(chained, false), (created, true)]);
    }

    #[test]
    fn test_repeated_sites_collapse_and_overriders_come_first() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, "m");
        let overriding = method(&mut tree, "m");
        let site = call(&mut tree, "m", &["1", "2"]);
        let search = Scripted {
            usages: vec![RawUsage::new(site, m), RawUsage::new(site, m)],
            overriders: vec![overriding],
        };
        let delta = DeltaBuilder::for_declaration(&tree, m).unwrap().name("n").build().unwrap();

        let usages = UsageClassifier::new(&delta, &search, &search).classify(&tree);

        assert_eq!(usages.len(), 2);
        assert!(matches!(
            usages[0],
            Usage::Overrider {
                overriding: o,
                is_original_overrider: true,
                modify_args: true,
                modify_exceptions: true,
                ..
            } if o == overriding
        ));
        assert_eq!(call_sites(&usages), vec![site]);
    }
}
