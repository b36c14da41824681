//! Variable scopes
//!
//! Lexical lookup of the variables visible at a site, used to pick
//! forwarding arguments and fresh names.

use crate::host::SemanticModel;
use sigprop_tree::{variable_parts, NodeId, NodeKind, SyntaxTree, Visibility};
use std::collections::HashSet;

/// Variable visible at a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VisibleVariable {
    pub(crate) name: String,
    pub(crate) type_text: String,
    pub(crate) declaration: NodeId,
}

/// Variables visible at `site`, innermost first
///
/// Shadowed names are reported once. Locals declared at or after the
/// statement holding `site`, and any variable whose declaration encloses
/// `site`, are not visible.
pub(crate) fn visible_variables(
    tree: &dyn SyntaxTree,
    semantics: &dyn SemanticModel,
    site: NodeId,
) -> Vec<VisibleVariable> {
    let mut out: Vec<VisibleVariable> = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |tree: &dyn SyntaxTree, var: NodeId, out: &mut Vec<VisibleVariable>| {
        let (type_text, name) = variable_parts(tree, var);
        if !name.is_empty() && seen.insert(name.to_string()) {
            out.push(VisibleVariable {
                name: name.to_string(),
                type_text: type_text.to_string(),
                declaration: var,
            });
        }
    };

    let mut child = site;
    for ancestor in tree.ancestors(site) {
        match tree.kind(ancestor) {
            NodeKind::Block => {
                let before = tree
                    .children(ancestor)
                    .into_iter()
                    .take_while(|s| *s != child)
                    .collect::<Vec<_>>();
                for stmt in before.into_iter().rev() {
                    if tree.kind(stmt) == NodeKind::LocalVar {
                        push(tree, stmt, &mut out);
                    }
                }
            }
            NodeKind::Method | NodeKind::Constructor | NodeKind::Lambda | NodeKind::Catch => {
                let params = match tree.kind(ancestor) {
                    NodeKind::Catch => tree.children_of_kind(ancestor, NodeKind::Parameter),
                    _ => tree
                        .child_of_kind(ancestor, NodeKind::ParameterList)
                        .map(|list| tree.children_of_kind(list, NodeKind::Parameter))
                        .unwrap_or_default(),
                };
                for p in params {
                    push(tree, p, &mut out);
                }
            }
            NodeKind::Class => {
                for field in tree.children_of_kind(ancestor, NodeKind::Field) {
                    if tree.is_ancestor_or_self(field, site) {
                        continue;
                    }
                    let visibility = tree
                        .child_of_kind(field, NodeKind::Modifiers)
                        .map_or(Visibility::Package, |m| Visibility::from_modifiers(tree.text(m)));
                    if semantics.is_accessible(tree, field, visibility, site) {
                        push(tree, field, &mut out);
                    }
                }
            }
            NodeKind::File => break,
            _ => {}
        }
        child = ancestor;
    }
    out
}

/// Every variable name declared inside `root`
pub(crate) fn declared_names(tree: &dyn SyntaxTree, root: NodeId) -> HashSet<String> {
    tree.descendants(root)
        .into_iter()
        .filter(|n| matches!(tree.kind(*n), NodeKind::Parameter | NodeKind::LocalVar))
        .map(|n| variable_parts(tree, n).1.to_string())
        .collect()
}

/// `base`, `base1`, `base2`, ... whichever is first not in `taken`
pub(crate) fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|i| format!("{base}{i}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Whether `stmt` is an explicit `super(...)`/`this(...)` call statement
pub(crate) fn is_chaining_statement(tree: &dyn SyntaxTree, stmt: NodeId) -> bool {
    tree.kind(stmt) == NodeKind::ExprStatement
        && tree
            .children(stmt)
            .first()
            .and_then(|c| sigprop_tree::CallShape::read(tree, *c))
            .is_some_and(|shape| shape.is_chaining(tree))
}

/// Whether the body of a constructor starts with explicit chaining
pub(crate) fn has_explicit_chaining(tree: &dyn SyntaxTree, ctor: NodeId) -> bool {
    tree.child_of_kind(ctor, NodeKind::Block)
        .and_then(|body| tree.children(body).first().copied())
        .is_some_and(|first| is_chaining_statement(tree, first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigprop_tree::{factory, MemoryTree};

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

    #[test]
    fn test_locals_after_site_not_visible() {
        let mut tree = MemoryTree::new();
        let one = factory::expression(&mut tree, "1");
        let before = factory::local_var(&mut tree, "int", "x", Some(one)).unwrap();
        let site = factory::expression(&mut tree, "call()");
        let stmt = factory::expr_statement(&mut tree, site).unwrap();
        let after = factory::local_var(&mut tree, "int", "y", None).unwrap();
        factory::block(&mut tree, &[before, stmt, after]).unwrap();

        let names: Vec<_> = visible_variables(&tree, &Exact, site)
            .into_iter()
            .map(|v| v.name)
            .collect();

        assert_eq!(names, vec!["x".to_string()]);
    }

    #[test]
    fn test_enclosing_declaration_excluded() {
        let mut tree = MemoryTree::new();
        let site = factory::expression(&mut tree, "call()");
        let var = factory::local_var(&mut tree, "int", "x", Some(site)).unwrap();
        factory::block(&mut tree, &[var]).unwrap();

        assert!(visible_variables(&tree, &Exact, site).is_empty());
    }

    #[test]
    fn test_unique_name() {
        let taken: HashSet<String> = ["e", "e1"].iter().map(ToString::to_string).collect();
        assert_eq!(unique_name("e", &taken), "e2");
        assert_eq!(unique_name("ex", &taken), "ex");
    }
}
