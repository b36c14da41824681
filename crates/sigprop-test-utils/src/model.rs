//! Static search and semantic fixtures
//!
//! [`StaticModel`] answers the host questions by walking the tree: names and
//! arities resolve calls, and a recorded supertype table stands in for the
//! type checker.

use sigprop_core::{RawUsage, SearchProvider, SemanticModel};
use sigprop_tree::{
    constructors_of, containing_class, CallShape, NodeId, NodeKind, SignatureView, SyntaxTree,
};
use std::collections::{HashMap, VecDeque};

const EXCEPTIONS: &[(&str, &str)] = &[
    ("Exception", "Throwable"),
    ("Error", "Throwable"),
    ("RuntimeException", "Exception"),
    ("IOException", "Exception"),
    ("FileNotFoundException", "IOException"),
    ("InterruptedException", "Exception"),
    ("SQLException", "Exception"),
    ("IllegalStateException", "RuntimeException"),
    ("IllegalArgumentException", "RuntimeException"),
    ("NullPointerException", "RuntimeException"),
];

/// Name-based resolution over the files of a program
#[derive(Debug, Clone)]
pub struct StaticModel {
    files: Vec<NodeId>,
    supertypes: HashMap<String, Vec<String>>,
}

fn erase(type_text: &str) -> String {
    let mut out = String::with_capacity(type_text.len());
    let mut depth = 0usize;
    for c in type_text.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && !c.is_whitespace() => out.push(c),
            _ => {}
        }
    }
    out
}

impl StaticModel {
    /// Model over `files` with the standard exception hierarchy
    pub fn new(files: Vec<NodeId>) -> Self {
        let mut model = Self {
            files,
            supertypes: HashMap::new(),
        };
        for (sub, sup) in EXCEPTIONS {
            model.add_supertype(sub, sup);
        }
        model
    }

    /// Record that `sub` directly extends or implements `sup`
    pub fn add_supertype(&mut self, sub: &str, sup: &str) {
        self.supertypes
            .entry(erase(sub))
            .or_default()
            .push(erase(sup));
    }

    /// With an extra supertype edge
    #[must_use]
    pub fn with_supertype(mut self, sub: &str, sup: &str) -> Self {
        self.add_supertype(sub, sup);
        self
    }

    /// Direct supertypes of `name`
    pub fn direct_supertypes(&self, name: &str) -> &[String] {
        self.supertypes.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    fn all_nodes(&self, tree: &dyn SyntaxTree) -> Vec<NodeId> {
        self.files.iter().flat_map(|f| tree.descendants(*f)).collect()
    }

    fn classes(&self, tree: &dyn SyntaxTree) -> Vec<NodeId> {
        self.all_nodes(tree)
            .into_iter()
            .filter(|n| tree.kind(*n) == NodeKind::Class && !tree.text(*n).is_empty())
            .collect()
    }

    fn class_named(&self, tree: &dyn SyntaxTree, name: &str) -> Option<NodeId> {
        let name = erase(name);
        self.classes(tree).into_iter().find(|c| tree.text(*c) == name)
    }

    fn superclass(&self, tree: &dyn SyntaxTree, class: NodeId) -> Option<NodeId> {
        self.direct_supertypes(tree.text(class))
            .iter()
            .find_map(|s| self.class_named(tree, s))
    }

    fn accepts(tree: &dyn SyntaxTree, decl: NodeId, args: usize) -> bool {
        let Ok(signature) = SignatureView::read(tree, decl) else {
            return false;
        };
        let count = signature.parameters.len();
        count == args || (signature.is_vararg() && args + 1 >= count)
    }

    /// Method `name` accepting `args` arguments in `class` or its supertypes
    fn lookup_method(&self, tree: &dyn SyntaxTree, class: NodeId, name: &str, args: usize) -> Option<NodeId> {
        let mut queue = VecDeque::from([class]);
        while let Some(c) = queue.pop_front() {
            let found = tree
                .children_of_kind(c, NodeKind::Method)
                .into_iter()
                .find(|m| Self::declared_name(tree, *m) == name && Self::accepts(tree, *m, args));
            if found.is_some() {
                return found;
            }
            for sup in self.direct_supertypes(tree.text(c)) {
                queue.extend(self.class_named(tree, sup));
            }
        }
        None
    }

    fn constructor_of(tree: &dyn SyntaxTree, class: NodeId, args: usize) -> Option<NodeId> {
        constructors_of(tree, class)
            .into_iter()
            .find(|c| Self::accepts(tree, *c, args))
    }

    fn declared_name(tree: &dyn SyntaxTree, decl: NodeId) -> &str {
        tree.child_of_kind(decl, NodeKind::Name)
            .map(|n| tree.text(n))
            .unwrap_or_default()
    }

    fn parameter_types(tree: &dyn SyntaxTree, decl: NodeId) -> Option<Vec<String>> {
        SignatureView::read(tree, decl)
            .ok()
            .map(|s| s.parameters.iter().map(|p| erase(&p.type_text)).collect())
    }

    fn same_signature(tree: &dyn SyntaxTree, a: NodeId, b: NodeId) -> bool {
        Self::declared_name(tree, a) == Self::declared_name(tree, b)
            && Self::parameter_types(tree, a) == Self::parameter_types(tree, b)
    }

    fn resolve_call(&self, tree: &dyn SyntaxTree, site: NodeId) -> Option<NodeId> {
        let shape = CallShape::read(tree, site)?;
        let args = tree.children(shape.arguments).len();
        if tree.kind(site) == NodeKind::New {
            let ty = tree.child_of_kind(site, NodeKind::TypeRef)?;
            let class = self.class_named(tree, tree.text(ty))?;
            return Self::constructor_of(tree, class, args);
        }

        let name = shape.callee_name(tree)?;
        let here = containing_class(tree, site);
        if shape.is_chaining(tree) {
            let class = if name == "super" {
                self.superclass(tree, here?)?
            } else {
                here?
            };
            return Self::constructor_of(tree, class, args);
        }

        match shape.qualifier(tree).map(|q| tree.text(q)) {
            None | Some("this") => {
                let mut class = here;
                while let Some(c) = class {
                    if let Some(found) = self.lookup_method(tree, c, name, args) {
                        return Some(found);
                    }
                    class = containing_class(tree, c);
                }
                None
            }
            Some("super") => self.lookup_method(tree, self.superclass(tree, here?)?, name, args),
            Some(qualifier) => match self.class_named(tree, qualifier) {
                Some(class) => self.lookup_method(tree, class, name, args),
                None => self
                    .classes(tree)
                    .into_iter()
                    .find_map(|c| self.lookup_method(tree, c, name, args)),
            },
        }
    }

    fn resolve_method_ref(&self, tree: &dyn SyntaxTree, site: NodeId) -> Option<NodeId> {
        let (qualifier, name) = tree.text(site).rsplit_once("::")?;
        let class = match qualifier {
            "this" => containing_class(tree, site)?,
            "super" => self.superclass(tree, containing_class(tree, site)?)?,
            q => self.class_named(tree, q)?,
        };
        if name == "new" {
            return constructors_of(tree, class).into_iter().next();
        }
        tree.children_of_kind(class, NodeKind::Method)
            .into_iter()
            .find(|m| Self::declared_name(tree, *m) == name)
    }

    fn chains_explicitly(tree: &dyn SyntaxTree, ctor: NodeId) -> bool {
        tree.child_of_kind(ctor, NodeKind::Block)
            .and_then(|body| tree.children(body).first().copied())
            .filter(|s| tree.kind(*s) == NodeKind::ExprStatement)
            .and_then(|s| tree.children(s).first().copied())
            .and_then(|c| CallShape::read(tree, c))
            .is_some_and(|shape| shape.is_chaining(tree))
    }
}

impl SemanticModel for StaticModel {
    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let (sub, sup) = (erase(sub), erase(sup));
        if sub == sup || sup == "Object" {
            return true;
        }
        let mut queue = VecDeque::from([sub]);
        let mut seen = Vec::new();
        while let Some(t) = queue.pop_front() {
            for s in self.direct_supertypes(&t) {
                if *s == sup {
                    return true;
                }
                if !seen.contains(s) {
                    seen.push(s.clone());
                    queue.push_back(s.clone());
                }
            }
        }
        false
    }

    fn is_checked_exception(&self, type_text: &str) -> bool {
        let t = erase(type_text);
        if !self.is_subtype(&t, "Throwable") {
            return t.ends_with("Exception") && !self.supertypes.contains_key(&t);
        }
        !self.is_subtype(&t, "RuntimeException") && !self.is_subtype(&t, "Error")
    }

    fn resolve_reference(&self, tree: &dyn SyntaxTree, site: NodeId) -> Option<NodeId> {
        match tree.kind(site) {
            NodeKind::Call | NodeKind::New => self.resolve_call(tree, site),
            NodeKind::MethodRef => self.resolve_method_ref(tree, site),
            _ => None,
        }
    }

    fn erasure(&self, type_text: &str) -> String {
        erase(type_text)
    }
}

impl SearchProvider for StaticModel {
    fn find_usages(&self, tree: &dyn SyntaxTree, declaration: NodeId) -> Vec<RawUsage> {
        let mut out: Vec<RawUsage> = self
            .all_nodes(tree)
            .into_iter()
            .filter(|n| matches!(tree.kind(*n), NodeKind::Call | NodeKind::New | NodeKind::MethodRef))
            .filter(|n| self.resolve_reference(tree, *n) == Some(declaration))
            .map(|n| RawUsage::new(n, declaration))
            .collect();

        let implicit_target = tree.kind(declaration) == NodeKind::Constructor
            && SignatureView::read(tree, declaration).is_ok_and(|s| s.parameters.is_empty());
        if let (true, Some(owner)) = (implicit_target, containing_class(tree, declaration)) {
            let owner_name = tree.text(owner).to_string();
            for class in self.classes(tree) {
                if !self.direct_supertypes(tree.text(class)).contains(&owner_name) {
                    continue;
                }
                let ctors = constructors_of(tree, class);
                if ctors.is_empty() {
                    out.push(RawUsage::new(class, declaration));
                }
                for ctor in ctors {
                    if !Self::chains_explicitly(tree, ctor) {
                        out.push(RawUsage::new(ctor, declaration));
                    }
                }
            }
        }
        out
    }

    fn find_overriders(&self, tree: &dyn SyntaxTree, declaration: NodeId) -> Vec<NodeId> {
        if tree.kind(declaration) != NodeKind::Method {
            return Vec::new();
        }
        let Some(owner) = containing_class(tree, declaration) else {
            return Vec::new();
        };
        let owner_name = tree.text(owner).to_string();
        self.classes(tree)
            .into_iter()
            .filter(|c| *c != owner && self.is_subtype(tree.text(*c), &owner_name))
            .flat_map(|c| tree.children_of_kind(c, NodeKind::Method))
            .filter(|m| Self::same_signature(tree, *m, declaration))
            .collect()
    }

    fn find_super_declarations(&self, tree: &dyn SyntaxTree, declaration: NodeId) -> Vec<NodeId> {
        if tree.kind(declaration) != NodeKind::Method {
            return Vec::new();
        }
        let Some(owner) = containing_class(tree, declaration) else {
            return Vec::new();
        };
        let owner_name = tree.text(owner).to_string();
        self.classes(tree)
            .into_iter()
            .filter(|c| *c != owner && self.is_subtype(&owner_name, tree.text(*c)))
            .flat_map(|c| tree.children_of_kind(c, NodeKind::Method))
            .filter(|m| Self::same_signature(tree, *m, declaration))
            .collect()
    }
}
