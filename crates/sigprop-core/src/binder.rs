//! Argument binding
//!
//! Provides [`ArgumentBinder`], which rewrites one call's argument list for
//! the new parameter list: reordering, dropping, inserting defaults and
//! converting between variadic and array forms.

use crate::error::EngineError;
use crate::host::SemanticModel;
use crate::scope::visible_variables;
use indexmap::IndexMap;
use sigprop_delta::{ParameterDelta, SignatureDelta};
use sigprop_reconcile::synchronize_list;
use sigprop_tree::{factory, CallShape, NodeId, NodeKind, SyntaxTree};

/// Default expressions chosen before the run, by new parameter name
pub type DefaultValues = IndexMap<String, String>;

/// How a call site is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindMode {
    /// Insert defaults for new parameters instead of forwarding names
    pub insert_defaults: bool,
    /// Only append new parameters (call to a propagated caller)
    pub append_only: bool,
}

/// A new argument that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindNote {
    /// Several variables could supply the value
    Ambiguous {
        /// Parameter name
        parameter: String,
    },
    /// Nothing supplied the value; a hole was left
    Missing {
        /// Parameter name
        parameter: String,
    },
}

impl BindNote {
    /// Parameter the note is about
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::Ambiguous { parameter } | Self::Missing { parameter } => parameter,
        }
    }
}

/// Rewrites argument lists
pub struct ArgumentBinder<'a> {
    delta: &'a SignatureDelta,
    semantics: &'a dyn SemanticModel,
    defaults: &'a DefaultValues,
}

enum Candidate {
    One(String),
    None,
    Many,
}

impl<'a> ArgumentBinder<'a> {
    /// Create binder
    #[must_use]
    pub fn new(
        delta: &'a SignatureDelta,
        semantics: &'a dyn SemanticModel,
        defaults: &'a DefaultValues,
    ) -> Self {
        Self {
            delta,
            semantics,
            defaults,
        }
    }

    /// Rewrite the arguments of `call`
    ///
    /// # Errors
    /// Returns error if the tree refuses an edit.
    pub fn bind(
        &self,
        tree: &mut dyn SyntaxTree,
        call: NodeId,
        mode: BindMode,
    ) -> Result<Vec<BindNote>, EngineError> {
        let delta = self.delta;
        let mut notes = Vec::new();
        if !delta.is_parameter_set_or_order_changed() && !delta.is_vararg_shape_changed() {
            return Ok(notes);
        }
        let Some(shape) = CallShape::read(&*tree, call) else {
            return Ok(notes);
        };
        let list = shape.arguments;

        if mode.append_only {
            for p in delta.created_parameters_without_varargs() {
                let arg = if mode.insert_defaults {
                    self.default_value(tree, list, p, &mut notes)?
                } else {
                    Some(factory::reference(tree, None, p.name())?)
                };
                if let Some(arg) = arg {
                    tree.append(list, arg)?;
                }
            }
            return Ok(notes);
        }

        let args = tree.children(list);
        let params = delta.parameters();
        let non_vararg_count = if delta.was_vararg() {
            delta.old_parameter_count().saturating_sub(1)
        } else {
            args.len()
        };
        if args.len() < non_vararg_count {
            tracing::debug!("call {} has fewer arguments than fixed parameters", call);
            return Ok(notes);
        }
        let vararg_count = args.len() - non_vararg_count;

        let mut spread: Option<Vec<NodeId>> = None;
        let (new_non_vararg_count, new_args_len) = if delta.array_to_varargs() {
            let nnv = params.len() - 1;
            let array = params[nnv].old_index().and_then(|i| args.get(i).copied());
            spread = array.and_then(|a| array_elements(&*tree, a));
            let len = spread.as_ref().map_or(params.len(), |e| nnv + e.len());
            (nnv, len)
        } else if delta.retains_varargs() {
            let nnv = params.len() - 1;
            (nnv, nnv + vararg_count)
        } else if delta.obtains_varargs() {
            let nnv = params.len() - 1;
            (nnv, nnv)
        } else {
            (params.len(), params.len())
        };

        let old_varargs: Option<&[NodeId]> = (delta.was_vararg() && !delta.retains_varargs())
            .then(|| &args[non_vararg_count..]);

        let mut desired: Vec<Option<NodeId>> = vec![None; new_args_len];
        for (i, p) in params.iter().enumerate().take(new_non_vararg_count) {
            if let Some(varargs) = old_varargs.filter(|_| p.old_index() == Some(non_vararg_count)) {
                if p.type_text().ends_with("[]") || p.is_vararg() {
                    let substituted = self.semantics.substitute(&*tree, call, &p.array_type_text());
                    let array_type = self.semantics.erasure(&substituted);
                    desired[i] = Some(factory::new_array(tree, &array_type, varargs)?);
                    continue;
                }
            }
            desired[i] = self.actual_argument(tree, list, &args, p, mode, &mut notes)?;
        }

        if delta.array_to_varargs() {
            match spread {
                Some(elements) => {
                    for (slot, element) in desired[new_non_vararg_count..].iter_mut().zip(elements) {
                        *slot = Some(element);
                    }
                }
                None => {
                    let p = &params[new_non_vararg_count];
                    desired[new_non_vararg_count] =
                        self.actual_argument(tree, list, &args, p, mode, &mut notes)?;
                }
            }
        } else if new_args_len > new_non_vararg_count {
            let p = &params[new_non_vararg_count];
            match p.old_index() {
                Some(old) if old != non_vararg_count => {
                    desired[new_non_vararg_count] =
                        self.actual_argument(tree, list, &args, p, mode, &mut notes)?;
                }
                _ => {
                    let carried = &args[non_vararg_count..non_vararg_count + (new_args_len - new_non_vararg_count)];
                    for (slot, arg) in desired[new_non_vararg_count..].iter_mut().zip(carried) {
                        *slot = Some(*arg);
                    }
                }
            }
        }

        let mask: Vec<bool> = if delta.was_vararg() {
            let mut mask = delta.to_remove().to_vec();
            mask.resize(args.len(), mask.last().copied().unwrap_or(false));
            mask
        } else {
            delta.to_remove().to_vec()
        };
        synchronize_list(tree, list, &desired, &mask)?;
        Ok(notes)
    }

    fn actual_argument(
        &self,
        tree: &mut dyn SyntaxTree,
        list: NodeId,
        args: &[NodeId],
        p: &ParameterDelta,
        mode: BindMode,
        notes: &mut Vec<BindNote>,
    ) -> Result<Option<NodeId>, EngineError> {
        if let Some(arg) = p.old_index().and_then(|i| args.get(i)) {
            return Ok(Some(*arg));
        }
        if mode.insert_defaults {
            self.default_value(tree, list, p, notes)
        } else {
            Ok(Some(factory::reference(tree, None, p.name())?))
        }
    }

    /// Resolve a value for new parameter `p` at the call owning `list`
    fn default_value(
        &self,
        tree: &mut dyn SyntaxTree,
        list: NodeId,
        p: &ParameterDelta,
        notes: &mut Vec<BindNote>,
    ) -> Result<Option<NodeId>, EngineError> {
        let mut ambiguous = false;
        if p.use_any_single_variable() {
            match self.single_variable(&*tree, list, p.type_text()) {
                Candidate::One(name) => return Ok(Some(factory::expression(tree, &name))),
                Candidate::Many => ambiguous = true,
                Candidate::None => {
                    if let Some(this) = self.this_expression(&*tree, list, p.type_text()) {
                        return Ok(Some(factory::expression(tree, &this)));
                    }
                }
            }
        }

        let configured = p
            .default_value()
            .map(str::to_string)
            .or_else(|| self.defaults.get(p.name()).cloned());
        if let Some(text) = configured.filter(|t| !t.trim().is_empty()) {
            return Ok(Some(factory::expression(tree, &text)));
        }

        let call = tree.parent(list).unwrap_or(list);
        if let Some(text) = self.semantics.actual_value(&*tree, call, p) {
            return Ok(Some(factory::expression(tree, &text)));
        }

        let parameter = p.name().to_string();
        tracing::warn!("no value for parameter '{}' at {}", parameter, call);
        notes.push(if ambiguous {
            BindNote::Ambiguous { parameter }
        } else {
            BindNote::Missing { parameter }
        });
        Ok(None)
    }

    fn single_variable(&self, tree: &dyn SyntaxTree, site: NodeId, type_text: &str) -> Candidate {
        let mut found = visible_variables(tree, self.semantics, site)
            .into_iter()
            .filter(|v| !v.type_text.is_empty() && self.semantics.is_assignable(type_text, &v.type_text))
            .take(2);
        match (found.next(), found.next()) {
            (Some(only), None) => Candidate::One(only.name),
            (Some(_), Some(_)) => Candidate::Many,
            _ => Candidate::None,
        }
    }

    /// `this` or `Outer.this` when exactly one enclosing class fits
    fn this_expression(&self, tree: &dyn SyntaxTree, site: NodeId, type_text: &str) -> Option<String> {
        let classes: Vec<NodeId> = tree
            .ancestors(site)
            .into_iter()
            .filter(|a| tree.kind(*a) == NodeKind::Class)
            .collect();
        let mut fitting = classes
            .iter()
            .enumerate()
            .filter(|(_, c)| !tree.text(**c).is_empty())
            .filter(|(_, c)| self.semantics.is_assignable(type_text, tree.text(**c)));
        match (fitting.next(), fitting.next()) {
            (Some((0, _)), None) => Some("this".to_string()),
            (Some((_, class)), None) => Some(format!("{}.this", tree.text(*class))),
            _ => None,
        }
    }
}

/// Elements of an array-literal argument (`new T[]{...}`)
fn array_elements(tree: &dyn SyntaxTree, arg: NodeId) -> Option<Vec<NodeId>> {
    if tree.kind(arg) != NodeKind::NewArray {
        return None;
    }
    tree.child_of_kind(arg, NodeKind::ArrayInit)
        .map(|init| tree.children(init))
}

/// Zero literal for a type
#[must_use]
pub fn zero_literal(type_text: &str) -> &'static str {
    match type_text {
        "boolean" => "false",
        "char" => "'\\0'",
        "byte" | "short" | "int" | "long" => "0",
        "float" | "double" => "0.0",
        _ => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sigprop_delta::DeltaBuilder;
    use sigprop_tree::MemoryTree;

    struct Exact;

    impl SemanticModel for Exact {
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

    const REWRITE: BindMode = BindMode {
        insert_defaults: true,
        append_only: false,
    };

    fn method(tree: &mut MemoryTree, params: &[(&str, &str)]) -> NodeId {
        let mods = tree.create(NodeKind::Modifiers, "");
        let ret = tree.create(NodeKind::TypeRef, "void");
        let name = tree.create(NodeKind::Name, "m");
        let list = tree.create(NodeKind::ParameterList, "");
        for (ty, n) in params {
            let p = factory::parameter(tree, ty, n).unwrap();
            tree.append(list, p).unwrap();
        }
        let throws = tree.create(NodeKind::ThrowsList, "");
        factory::node(tree, NodeKind::Method, "", &[mods, ret, name, list, throws]).unwrap()
    }

    fn call(tree: &mut MemoryTree, args: &[&str]) -> NodeId {
        let callee = factory::reference(tree, None, "m").unwrap();
        let args: Vec<_> = args.iter().map(|a| factory::expression(tree, a)).collect();
        factory::call(tree, callee, &args).unwrap()
    }

    #[test]
    fn test_reorder_reuses_arguments() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, &[("int", "a"), ("int", "b")]);
        let c = call(&mut tree, &["1", "2"]);
        let before = tree.children(tree.children(c)[1]);
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .parameters(vec![
                ParameterDelta::existing(1, "b", "int"),
                ParameterDelta::existing(0, "a", "int"),
            ])
            .build()
            .unwrap();

        let notes = ArgumentBinder::new(&delta, &Exact, &DefaultValues::new())
            .bind(&mut tree, c, REWRITE)
            .unwrap();

        assert!(notes.is_empty());
        assert_eq!(tree.render(c), "m(2, 1)");
        assert_eq!(tree.children(tree.children(c)[1]), vec![before[1], before[0]]);
    }

    #[test]
    fn test_missing_default_leaves_hole() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, &[("int", "a")]);
        let c = call(&mut tree, &["1"]);
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .add_parameter(ParameterDelta::added("b", "int"))
            .build()
            .unwrap();

        let notes = ArgumentBinder::new(&delta, &Exact, &DefaultValues::new())
            .bind(&mut tree, c, REWRITE)
            .unwrap();

        assert_eq!(tree.render(c), "m(1, )");
        assert_eq!(notes, vec![BindNote::Missing { parameter: "b".into() }]);
    }

    #[test]
    fn test_chosen_default_used() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, &[]);
        let c = call(&mut tree, &[]);
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .add_parameter(ParameterDelta::added("flag", "boolean"))
            .build()
            .unwrap();
        let mut defaults = DefaultValues::new();
        defaults.insert("flag".to_string(), "true".to_string());

        ArgumentBinder::new(&delta, &Exact, &defaults)
            .bind(&mut tree, c, REWRITE)
            .unwrap();

        assert_eq!(tree.render(c), "m(true)");
    }

    #[test]
    fn test_forwarding_names_when_not_inserting_defaults() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, &[("int", "a")]);
        let c = call(&mut tree, &["a"]);
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .add_parameter(ParameterDelta::added("b", "String").with_default("\"x\""))
            .build()
            .unwrap();

        ArgumentBinder::new(&delta, &Exact, &DefaultValues::new())
            .bind(
                &mut tree,
                c,
                BindMode {
                    insert_defaults: false,
                    append_only: false,
                },
            )
            .unwrap();

        assert_eq!(tree.render(c), "m(a, b)");
    }

    #[test]
    fn test_array_literal_spread_into_varargs() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, &[("int[]", "xs")]);
        let callee = factory::reference(&mut tree, None, "m").unwrap();
        let elems: Vec<_> = ["1", "2"].iter().map(|e| factory::expression(&mut tree, e)).collect();
        let array = factory::new_array(&mut tree, "int[]", &elems).unwrap();
        let c = factory::call(&mut tree, callee, &[array]).unwrap();
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .parameters(vec![ParameterDelta::existing(0, "xs", "int...")])
            .build()
            .unwrap();
        assert!(delta.array_to_varargs());

        ArgumentBinder::new(&delta, &Exact, &DefaultValues::new())
            .bind(&mut tree, c, REWRITE)
            .unwrap();

        assert_eq!(tree.render(c), "m(1, 2)");
        assert_eq!(tree.children(tree.children(c)[1]), elems);
    }

    #[test]
    fn test_zero_literals() {
        assert_eq!(zero_literal("int"), "0");
        assert_eq!(zero_literal("boolean"), "false");
        assert_eq!(zero_literal("String"), "null");
    }
}
