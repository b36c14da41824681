//! Declaration rewriting
//!
//! Provides [`DeclarationRewriter`], which edits method and constructor
//! declarations: the primary target, its overriders, propagated callers,
//! forwarding delegates and synthesized constructors.

use crate::binder::{zero_literal, DefaultValues};
use crate::contract::reindex_contract;
use crate::error::EngineError;
use crate::exceptions::extend_throws_list;
use crate::host::SemanticModel;
use sigprop_delta::SignatureDelta;
use sigprop_reconcile::{synchronize_list, ChildrenOfKind, SequenceReconciler};
use sigprop_tree::{
    containing_class, factory, variable_parts, DeclarationShape, NodeId, NodeKind, SyntaxTree,
    Visibility,
};

/// Edits declarations for one delta
pub struct DeclarationRewriter<'a> {
    delta: &'a SignatureDelta,
    semantics: &'a dyn SemanticModel,
    defaults: &'a DefaultValues,
}

impl<'a> DeclarationRewriter<'a> {
    /// Create rewriter
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

    /// Apply the full signature change to the target or an original overrider
    ///
    /// # Errors
    /// Returns error if `decl` is malformed or the tree refuses an edit.
    pub fn rewrite(&self, tree: &mut dyn SyntaxTree, decl: NodeId) -> Result<(), EngineError> {
        let delta = self.delta;
        let shape = DeclarationShape::read(&*tree, decl)?;
        let is_primary = decl == delta.target();

        if delta.is_visibility_changed() {
            let modifiers = tree.text(shape.modifiers).to_string();
            let current = Visibility::from_modifiers(&modifiers);
            let wanted = if is_primary || delta.propagate_visibility() {
                delta.new_visibility()
            } else {
                current.max(delta.new_visibility())
            };
            if wanted != current {
                tree.set_text(shape.modifiers, &wanted.apply_to(&modifiers))?;
            }
        }

        if delta.is_name_changed() && tree.text(shape.name) == delta.old_name() {
            tree.set_text(shape.name, delta.new_name())?;
        }

        if delta.is_return_type_changed() {
            if let (Some(ret), Some(new)) = (shape.return_type, delta.new_return_type()) {
                let old = delta.old_signature().return_type.as_deref();
                if is_primary || Some(tree.text(ret)) == old {
                    let new = self.semantics.substitute(&*tree, decl, new);
                    tree.set_text(ret, &new)?;
                }
            }
        }

        // Docs first: tags are matched against the names before renaming.
        self.rewrite_doc(tree, &shape)?;
        if is_primary {
            self.qualify_shadowed_fields(tree, &shape)?;
        }
        self.rewrite_parameters(tree, &shape, is_primary)?;
        self.rewrite_throws(tree, &shape, is_primary)?;
        self.rewrite_contract(tree, &shape)?;

        tracing::debug!("rewrote declaration {}", decl);
        Ok(())
    }

    fn rewrite_parameters(
        &self,
        tree: &mut dyn SyntaxTree,
        shape: &DeclarationShape,
        is_primary: bool,
    ) -> Result<(), EngineError> {
        let delta = self.delta;
        if !(delta.is_parameter_set_or_order_changed()
            || delta.is_parameter_names_changed()
            || delta.is_parameter_types_changed())
        {
            return Ok(());
        }
        let old_params = shape.parameter_nodes(&*tree);
        let mut desired = Vec::with_capacity(delta.parameters().len());

        for p in delta.parameters() {
            let existing = p
                .old_index()
                .and_then(|i| old_params.get(i).map(|node| (i, *node)));
            let Some((index, node)) = existing else {
                let type_text = self.semantics.substitute(&*tree, shape.decl, p.type_text());
                desired.push(Some(factory::parameter(tree, &type_text, p.name())?));
                continue;
            };
            let (own_type, own_name) = variable_parts(&*tree, node);
            let (own_type, own_name) = (own_type.to_string(), own_name.to_string());

            let renamable = is_primary || delta.old_parameter_name(index) == Some(own_name.as_str());
            if own_name != p.name() && renamable {
                if let Some(name) = tree.child_of_kind(node, NodeKind::Name) {
                    tree.set_text(name, p.name())?;
                }
            }
            if delta.old_parameter_type(index) != Some(p.type_text()) {
                let type_text = self.semantics.substitute(&*tree, shape.decl, p.type_text());
                if let Some(ty) = tree.child_of_kind(node, NodeKind::TypeRef) {
                    if own_type != type_text {
                        tree.set_text(ty, &type_text)?;
                    }
                }
            }
            desired.push(Some(node));
        }

        synchronize_list(tree, shape.parameters, &desired, delta.to_remove())?;
        Ok(())
    }

    fn rewrite_throws(
        &self,
        tree: &mut dyn SyntaxTree,
        shape: &DeclarationShape,
        is_primary: bool,
    ) -> Result<(), EngineError> {
        let delta = self.delta;
        if !delta.is_exception_set_or_order_changed() {
            return Ok(());
        }
        let old = tree.children(shape.throws);
        if !is_primary && old.len() != delta.old_signature().exceptions.len() {
            // Overrider narrowed its throws list; only add what is new.
            let added: Vec<&str> = delta
                .added_exceptions()
                .into_iter()
                .map(|e| e.type_text())
                .collect();
            extend_throws_list(tree, self.semantics, shape.decl, &added)?;
            return Ok(());
        }

        let mut mask = vec![true; old.len()];
        let mut desired = Vec::with_capacity(delta.exceptions().len());
        for e in delta.exceptions() {
            match e.old_index().and_then(|i| old.get(i).map(|n| (i, *n))) {
                Some((i, node)) => {
                    mask[i] = false;
                    if tree.text(node) != e.type_text() {
                        tree.set_text(node, e.type_text())?;
                    }
                    desired.push(Some(node));
                }
                None => desired.push(Some(tree.create(NodeKind::TypeRef, e.type_text()))),
            }
        }
        synchronize_list(tree, shape.throws, &desired, &mask)?;
        Ok(())
    }

    fn rewrite_doc(&self, tree: &mut dyn SyntaxTree, shape: &DeclarationShape) -> Result<(), EngineError> {
        let delta = self.delta;
        let Some(doc) = shape.doc else {
            return Ok(());
        };
        if !(delta.is_parameter_set_or_order_changed() || delta.is_parameter_names_changed()) {
            return Ok(());
        }
        let own_names: Vec<String> = shape
            .parameter_nodes(&*tree)
            .into_iter()
            .map(|p| variable_parts(&*tree, p).1.to_string())
            .collect();
        let tags = tree.children_of_kind(doc, NodeKind::DocParam);
        let tag_for = |tree: &dyn SyntaxTree, name: &str| tags.iter().copied().find(|t| tree.text(*t) == name);

        let mut used = Vec::new();
        let mut desired = Vec::new();
        for p in delta.parameters() {
            match p.old_index() {
                Some(i) => {
                    let Some(tag) = own_names.get(i).and_then(|n| tag_for(&*tree, n)) else {
                        continue;
                    };
                    if tree.text(tag) != p.name() {
                        tree.set_text(tag, p.name())?;
                    }
                    used.push(tag);
                    desired.push(Some(tag));
                }
                None => desired.push(Some(tree.create(NodeKind::DocParam, p.name()))),
            }
        }

        let mut mask = Vec::with_capacity(tags.len());
        for tag in &tags {
            let is_used = used.contains(tag);
            let removed = !is_used
                && own_names
                    .iter()
                    .enumerate()
                    .any(|(i, n)| delta.to_remove().get(i) == Some(&true) && tree.text(*tag) == n);
            mask.push(removed);
            if !removed && !is_used {
                // Tags naming no parameter stay, after the parameter tags.
                desired.push(Some(*tag));
            }
        }

        SequenceReconciler::new(&ChildrenOfKind(NodeKind::DocParam))
            .with_removal_mask(&mask)
            .reconcile(tree, doc, &desired)?;
        Ok(())
    }

    fn rewrite_contract(&self, tree: &mut dyn SyntaxTree, shape: &DeclarationShape) -> Result<(), EngineError> {
        let Some(contract) = shape.contract else {
            return Ok(());
        };
        if !self.delta.is_parameter_set_or_order_changed() {
            return Ok(());
        }
        match reindex_contract(tree.text(contract), self.delta) {
            Ok(text) => tree.set_text(contract, &text)?,
            Err(reason) => tracing::warn!("contract of {} left unchanged: {}", shape.decl, reason),
        }
        Ok(())
    }

    /// Qualify field reads that a renamed parameter would shadow
    fn qualify_shadowed_fields(
        &self,
        tree: &mut dyn SyntaxTree,
        shape: &DeclarationShape,
    ) -> Result<(), EngineError> {
        let delta = self.delta;
        let Some(body) = shape.body else {
            return Ok(());
        };
        let Some(class) = containing_class(&*tree, shape.decl) else {
            return Ok(());
        };
        let fields: Vec<String> = tree
            .children_of_kind(class, NodeKind::Field)
            .into_iter()
            .map(|f| variable_parts(&*tree, f).1.to_string())
            .collect();

        for p in delta.parameters() {
            let Some(old_name) = p.old_index().and_then(|i| delta.old_parameter_name(i)) else {
                continue;
            };
            let was_parameter = delta.old_signature().parameters.iter().any(|o| o.name == p.name());
            if old_name == p.name() || was_parameter || !fields.iter().any(|f| f == p.name()) {
                continue;
            }
            let reads: Vec<NodeId> = tree
                .descendants(body)
                .into_iter()
                .filter(|n| {
                    tree.kind(*n) == NodeKind::Reference
                        && tree.children(*n).is_empty()
                        && tree.text(*n) == p.name()
                })
                .collect();
            for read in reads {
                let this = factory::expression(tree, "this");
                tree.insert_child(read, 0, this)?;
            }
        }
        Ok(())
    }

    /// Insert new parameters and/or exceptions into a caller or non-original overrider
    ///
    /// # Errors
    /// Returns error if the tree refuses an edit.
    pub fn propagate_into(
        &self,
        tree: &mut dyn SyntaxTree,
        decl: NodeId,
        insert_params: bool,
        insert_throws: bool,
    ) -> Result<(), EngineError> {
        let delta = self.delta;
        let shape = DeclarationShape::read(&*tree, decl)?;

        if insert_params {
            let existing = shape.parameter_nodes(&*tree);
            let names: Vec<String> = existing
                .iter()
                .map(|p| variable_parts(&*tree, *p).1.to_string())
                .collect();
            let trailing_vararg = existing
                .last()
                .copied()
                .filter(|p| variable_parts(&*tree, *p).0.ends_with("..."));
            let mut desired: Vec<Option<NodeId>> = existing
                .iter()
                .copied()
                .filter(|p| Some(*p) != trailing_vararg)
                .map(Some)
                .collect();
            let before = desired.len();
            for p in delta.created_parameters_without_varargs() {
                if names.iter().any(|n| n == p.name()) {
                    continue;
                }
                let type_text = self.semantics.substitute(&*tree, decl, p.type_text());
                desired.push(Some(factory::parameter(tree, &type_text, p.name())?));
            }
            if desired.len() > before {
                desired.extend(trailing_vararg.map(Some));
                synchronize_list(tree, shape.parameters, &desired, &[])?;
            }
        }

        if insert_throws {
            let added: Vec<&str> = delta
                .added_exceptions()
                .into_iter()
                .map(|e| e.type_text())
                .collect();
            extend_throws_list(tree, self.semantics, decl, &added)?;
        }
        Ok(())
    }

    /// Keep a copy of the old declaration forwarding to the new one
    ///
    /// # Errors
    /// Returns error if the tree refuses an edit.
    pub fn generate_delegate(&self, tree: &mut dyn SyntaxTree, decl: NodeId) -> Result<NodeId, EngineError> {
        let delta = self.delta;
        let parent = tree.parent(decl).ok_or_else(|| {
            EngineError::invalid_target(decl, "declaration is not inside a class")
        })?;
        let copy = tree.deep_copy(decl)?;
        tree.insert_before(parent, Some(decl), copy)?;

        let mut args = Vec::with_capacity(delta.parameters().len());
        for p in delta.parameters() {
            let arg = match p.old_index().and_then(|i| delta.old_parameter_name(i)) {
                Some(name) => factory::reference(tree, None, name)?,
                None => {
                    let text = p
                        .default_value()
                        .map(str::to_string)
                        .or_else(|| self.defaults.get(p.name()).cloned())
                        .unwrap_or_else(|| zero_literal(p.type_text()).to_string());
                    factory::expression(tree, &text)
                }
            };
            args.push(arg);
        }

        let is_constructor = delta.old_signature().is_constructor();
        let callee_name = if is_constructor { "this" } else { delta.new_name() };
        let callee = factory::reference(tree, None, callee_name)?;
        let call = factory::call(tree, callee, &args)?;
        let returns_value = delta
            .old_signature()
            .return_type
            .as_deref()
            .is_some_and(|t| t != "void");
        let stmt = if returns_value {
            factory::return_statement(tree, call)?
        } else {
            factory::expr_statement(tree, call)?
        };
        let body = factory::block(tree, &[stmt])?;
        match tree.child_of_kind(copy, NodeKind::Block) {
            Some(old_body) => tree.replace(old_body, body)?,
            None => tree.append(copy, body)?,
        }

        if let Some(modifiers) = tree.child_of_kind(copy, NodeKind::Modifiers) {
            let text = tree.text(modifiers);
            if text.split_whitespace().any(|m| m == "abstract") {
                let kept = text
                    .split_whitespace()
                    .filter(|m| *m != "abstract")
                    .collect::<Vec<_>>()
                    .join(" ");
                tree.set_text(modifiers, &kept)?;
            }
        }

        tracing::debug!("generated delegate {} for {}", copy, decl);
        Ok(copy)
    }

    /// Add an empty no-argument constructor to `class`
    ///
    /// # Errors
    /// Returns error if the tree refuses an edit.
    pub fn add_missing_constructor(&self, tree: &mut dyn SyntaxTree, class: NodeId) -> Result<NodeId, EngineError> {
        let visibility = tree
            .child_of_kind(class, NodeKind::Modifiers)
            .map_or(Visibility::Package, |m| Visibility::from_modifiers(tree.text(m)));
        let name = tree.text(class).to_string();
        let ctor = factory::constructor(tree, visibility.keyword(), &name)?;
        let first_member = tree
            .children(class)
            .into_iter()
            .find(|c| tree.kind(*c) != NodeKind::Modifiers);
        tree.insert_before(class, first_member, ctor)?;
        tracing::debug!("added constructor {} to {}", ctor, name);
        Ok(ctor)
    }
}

/// Insert `super();` as the first statement of `ctor`; returns the call
///
/// # Errors
/// Returns error if the tree refuses an edit.
pub fn insert_super_call(tree: &mut dyn SyntaxTree, ctor: NodeId) -> Result<NodeId, EngineError> {
    let body = match tree.child_of_kind(ctor, NodeKind::Block) {
        Some(body) => body,
        None => {
            let body = factory::block(tree, &[])?;
            tree.append(ctor, body)?;
            body
        }
    };
    let callee = factory::reference(tree, None, "super")?;
    let call = factory::call(tree, callee, &[])?;
    let stmt = factory::expr_statement(tree, call)?;
    tree.insert_child(body, 0, stmt)?;
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sigprop_delta::{DeltaBuilder, ParameterDelta};
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

    fn class(tree: &mut MemoryTree, modifiers: &str, name: &str) -> NodeId {
        let mods = tree.create(NodeKind::Modifiers, modifiers);
        factory::node(tree, NodeKind::Class, name, &[mods]).unwrap()
    }

    fn method(
        tree: &mut MemoryTree,
        modifiers: &str,
        ret: &str,
        params: &[(&str, &str)],
        body: &[NodeId],
    ) -> NodeId {
        let mods = tree.create(NodeKind::Modifiers, modifiers);
        let ret = tree.create(NodeKind::TypeRef, ret);
        let name = tree.create(NodeKind::Name, "m");
        let list = tree.create(NodeKind::ParameterList, "");
        for (ty, n) in params {
            let p = factory::parameter(tree, ty, n).unwrap();
            tree.append(list, p).unwrap();
        }
        let throws = tree.create(NodeKind::ThrowsList, "");
        let body = factory::block(tree, body).unwrap();
        factory::node(tree, NodeKind::Method, "", &[mods, ret, name, list, throws, body]).unwrap()
    }

    #[test]
    fn test_rename_and_reorder_primary() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, "public", "void", &[("int", "a"), ("int", "b")], &[]);
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .name("n")
            .parameters(vec![
                ParameterDelta::existing(1, "b", "int"),
                ParameterDelta::existing(0, "a", "int"),
            ])
            .build()
            .unwrap();

        DeclarationRewriter::new(&delta, &Exact, &DefaultValues::new())
            .rewrite(&mut tree, m)
            .unwrap();

        assert_eq!(tree.render(m), "public void n(int b, int a) { }");
    }

    #[test]
    fn test_doc_tags_follow_parameters() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, "", "void", &[("int", "a")], &[]);
        let tag = tree.create(NodeKind::DocParam, "a");
        let doc = factory::node(&mut tree, NodeKind::DocComment, "Adds.", &[tag]).unwrap();
        tree.insert_child(m, 0, doc).unwrap();
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .parameters(vec![
                ParameterDelta::existing(0, "x", "int"),
                ParameterDelta::added("y", "int"),
            ])
            .build()
            .unwrap();

        DeclarationRewriter::new(&delta, &Exact, &DefaultValues::new())
            .rewrite(&mut tree, m)
            .unwrap();

        assert_eq!(
            tree.render(m),
            "/** Adds. @param x @param y */ void m(int x, int y) { }"
        );
    }

    #[test]
    fn test_renamed_parameter_does_not_shadow_field() {
        let mut tree = MemoryTree::new();
        let c = class(&mut tree, "", "C");
        let ty = tree.create(NodeKind::TypeRef, "int");
        let name = tree.create(NodeKind::Name, "x");
        let field = factory::node(&mut tree, NodeKind::Field, "", &[ty, name]).unwrap();
        tree.append(c, field).unwrap();
        let read = factory::reference(&mut tree, None, "x").unwrap();
        let callee = factory::reference(&mut tree, None, "use").unwrap();
        let call = factory::call(&mut tree, callee, &[read]).unwrap();
        let stmt = factory::expr_statement(&mut tree, call).unwrap();
        let m = method(&mut tree, "", "void", &[("int", "a")], &[stmt]);
        tree.append(c, m).unwrap();
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .parameters(vec![ParameterDelta::existing(0, "x", "int")])
            .build()
            .unwrap();

        DeclarationRewriter::new(&delta, &Exact, &DefaultValues::new())
            .rewrite(&mut tree, m)
            .unwrap();

        assert_eq!(tree.render(m), "void m(int x) { use(this.x); }");
    }

    #[test]
    fn test_delegate_forwards_to_new_signature() {
        let mut tree = MemoryTree::new();
        let c = class(&mut tree, "", "C");
        let a = factory::reference(&mut tree, None, "a").unwrap();
        let ret = factory::return_statement(&mut tree, a).unwrap();
        let m = method(&mut tree, "", "int", &[("int", "a")], &[ret]);
        tree.append(c, m).unwrap();
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .add_parameter(ParameterDelta::added("b", "int").with_default("7"))
            .generate_delegate(true)
            .build()
            .unwrap();
        let defaults = DefaultValues::new();
        let rewriter = DeclarationRewriter::new(&delta, &Exact, &defaults);

        rewriter.generate_delegate(&mut tree, m).unwrap();
        rewriter.rewrite(&mut tree, m).unwrap();

        assert_eq!(
            tree.render(c),
            "class C { int m(int a) { return m(a, 7); } int m(int a, int b) { return a; } }"
        );
    }

    #[test]
    fn test_propagated_parameter_goes_before_varargs() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, "", "void", &[], &[]);
        let caller = method(&mut tree, "", "void", &[("String...", "rest")], &[]);
        let delta = DeltaBuilder::for_declaration(&tree, m)
            .unwrap()
            .add_parameter(ParameterDelta::added("c", "int"))
            .build()
            .unwrap();

        DeclarationRewriter::new(&delta, &Exact, &DefaultValues::new())
            .propagate_into(&mut tree, caller, true, false)
            .unwrap();

        assert_eq!(tree.render(caller), "void m(int c, String... rest) { }");
    }

    #[test]
    fn test_missing_constructor_with_super_call() {
        let mut tree = MemoryTree::new();
        let m = method(&mut tree, "", "void", &[], &[]);
        let d = class(&mut tree, "public", "D");
        let delta = DeltaBuilder::for_declaration(&tree, m).unwrap().build().unwrap();

        let ctor = DeclarationRewriter::new(&delta, &Exact, &DefaultValues::new())
            .add_missing_constructor(&mut tree, d)
            .unwrap();
        insert_super_call(&mut tree, ctor).unwrap();

        assert_eq!(tree.render(d), "public class D { public D() { super(); } }");
    }
}
