//! Program construction from source snippets

use crate::model::StaticModel;
use crate::parse::Parser;
use sigprop_tree::{factory, CallShape, MemoryTree, NodeId, NodeKind, SyntaxTree};

/// Builds a [`MemoryTree`] program one snippet at a time
///
/// Parse failures panic with the offending snippet; this is test code.
#[derive(Debug)]
pub struct ProgramBuilder {
    tree: MemoryTree,
    files: Vec<NodeId>,
    current: NodeId,
    supertypes: Vec<(String, String)>,
}

impl ProgramBuilder {
    /// Start a program with one file in `package`
    pub fn new(package: &str) -> Self {
        let mut tree = MemoryTree::new();
        let file = tree.create(NodeKind::File, package);
        Self {
            tree,
            files: vec![file],
            current: file,
            supertypes: Vec::new(),
        }
    }

    /// Start another file; later classes go there
    pub fn file(&mut self, package: &str) -> NodeId {
        let file = self.tree.create(NodeKind::File, package);
        self.files.push(file);
        self.current = file;
        file
    }

    /// Top-level class from a header like `public class Child extends Base`
    pub fn class(&mut self, header: &str) -> NodeId {
        let parent = self.current;
        self.class_in(parent, header)
    }

    /// Class nested in `outer`
    pub fn inner_class(&mut self, outer: NodeId, header: &str) -> NodeId {
        self.class_in(outer, header)
    }

    fn class_in(&mut self, parent: NodeId, header: &str) -> NodeId {
        let parsed = Parser::new(header, &mut self.tree)
            .and_then(|mut p| {
                let h = p.class_header()?;
                p.finish()?;
                Ok(h)
            })
            .unwrap_or_else(|e| panic!("cannot parse class header `{header}`: {e}"));
        for sup in &parsed.supertypes {
            self.supertypes.push((parsed.name.clone(), sup.clone()));
        }
        let mods = self.tree.create(NodeKind::Modifiers, &parsed.modifiers);
        let class = factory::node(&mut self.tree, NodeKind::Class, &parsed.name, &[mods])
            .unwrap_or_else(|e| panic!("{e}"));
        self.tree.append(parent, class).unwrap_or_else(|e| panic!("{e}"));
        class
    }

    /// Method, constructor or field declared in `class`
    pub fn member(&mut self, class: NodeId, source: &str) -> NodeId {
        let class_name = self.tree.text(class).to_string();
        let member = Parser::new(source, &mut self.tree)
            .and_then(|mut p| {
                let m = p.member(&class_name)?;
                p.finish()?;
                Ok(m)
            })
            .unwrap_or_else(|e| panic!("cannot parse member `{source}`: {e}"));
        self.tree.append(class, member).unwrap_or_else(|e| panic!("{e}"));
        member
    }

    /// Append a statement to the body of `decl` (or to a block)
    pub fn statement(&mut self, decl: NodeId, source: &str) -> NodeId {
        let block = if self.tree.kind(decl) == NodeKind::Block {
            decl
        } else {
            self.body(decl)
        };
        let stmt = Parser::new(source, &mut self.tree)
            .and_then(|mut p| {
                let s = p.statement()?;
                p.finish()?;
                Ok(s)
            })
            .unwrap_or_else(|e| panic!("cannot parse statement `{source}`: {e}"));
        self.tree.append(block, stmt).unwrap_or_else(|e| panic!("{e}"));
        stmt
    }

    /// Detached expression
    pub fn expression(&mut self, source: &str) -> NodeId {
        Parser::new(source, &mut self.tree)
            .and_then(|mut p| {
                let e = p.expression()?;
                p.finish()?;
                Ok(e)
            })
            .unwrap_or_else(|e| panic!("cannot parse expression `{source}`: {e}"))
    }

    /// Attach `/** description @param ... */` to `decl`
    pub fn doc(&mut self, decl: NodeId, description: &str, params: &[&str]) -> NodeId {
        let tags: Vec<NodeId> = params
            .iter()
            .map(|p| self.tree.create(NodeKind::DocParam, p))
            .collect();
        let doc = factory::node(&mut self.tree, NodeKind::DocComment, description, &tags)
            .unwrap_or_else(|e| panic!("{e}"));
        self.tree.insert_child(decl, 0, doc).unwrap_or_else(|e| panic!("{e}"));
        doc
    }

    /// Attach `@Contract("...")` to `decl`
    pub fn contract(&mut self, decl: NodeId, clauses: &str) -> NodeId {
        let contract = self.tree.create(NodeKind::Contract, clauses);
        let index = usize::from(self.tree.child_of_kind(decl, NodeKind::DocComment).is_some());
        self.tree
            .insert_child(decl, index, contract)
            .unwrap_or_else(|e| panic!("{e}"));
        contract
    }

    /// Body block of `decl`
    pub fn body(&self, decl: NodeId) -> NodeId {
        self.tree
            .child_of_kind(decl, NodeKind::Block)
            .unwrap_or_else(|| panic!("{decl} has no body"))
    }

    /// Call or `new` nodes whose callee (or created type) is `name`, in source order
    pub fn calls_named(&self, name: &str) -> Vec<NodeId> {
        let tree = &self.tree;
        self.files
            .iter()
            .flat_map(|f| tree.descendants(*f))
            .filter(|n| match tree.kind(*n) {
                NodeKind::Call => CallShape::read(tree, *n).and_then(|s| s.callee_name(tree)) == Some(name),
                NodeKind::New => tree
                    .child_of_kind(*n, NodeKind::TypeRef)
                    .is_some_and(|t| tree.text(t) == name),
                _ => false,
            })
            .collect()
    }

    /// The only call named `name`
    pub fn call(&self, name: &str) -> NodeId {
        match self.calls_named(name).as_slice() {
            [one] => *one,
            other => panic!("expected one call to `{name}`, found {}", other.len()),
        }
    }

    /// Render a subtree
    pub fn render(&self, node: NodeId) -> String {
        self.tree.render(node)
    }

    /// Files of the program
    pub fn files(&self) -> &[NodeId] {
        &self.files
    }

    /// Tree
    pub fn tree(&self) -> &MemoryTree {
        &self.tree
    }

    /// Mutable tree
    pub fn tree_mut(&mut self) -> &mut MemoryTree {
        &mut self.tree
    }

    /// Search and semantic model over the current program
    pub fn model(&self) -> StaticModel {
        let mut model = StaticModel::new(self.files.clone());
        for (sub, sup) in &self.supertypes {
            model.add_supertype(sub, sup);
        }
        model
    }
}
