//! Detached node construction
//!
//! Small helpers that assemble common subtrees out of [`SyntaxTree::create`]
//! and [`SyntaxTree::append`]. Every helper returns a detached root.

use crate::error::TreeError;
use crate::node::{NodeId, NodeKind};
use crate::tree::SyntaxTree;

/// Create node with the given children appended in order
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn node<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    kind: NodeKind,
    text: &str,
    children: &[NodeId],
) -> Result<NodeId, TreeError> {
    let id = tree.create(kind, text);
    for child in children {
        tree.append(id, *child)?;
    }
    Ok(id)
}

/// Opaque expression from source text
pub fn expression<T: SyntaxTree + ?Sized>(tree: &mut T, text: &str) -> NodeId {
    tree.create(NodeKind::Expression, text)
}

/// `Type name` formal parameter
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn parameter<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    type_text: &str,
    name: &str,
) -> Result<NodeId, TreeError> {
    let ty = tree.create(NodeKind::TypeRef, type_text);
    let n = tree.create(NodeKind::Name, name);
    node(tree, NodeKind::Parameter, "", &[ty, n])
}

/// Optionally qualified name reference
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn reference<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    qualifier: Option<NodeId>,
    name: &str,
) -> Result<NodeId, TreeError> {
    let children: Vec<NodeId> = qualifier.into_iter().collect();
    node(tree, NodeKind::Reference, name, &children)
}

/// `callee(args)` where `callee` is a reference node
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn call<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    callee: NodeId,
    args: &[NodeId],
) -> Result<NodeId, TreeError> {
    let list = node(tree, NodeKind::ArgumentList, "", args)?;
    node(tree, NodeKind::Call, "", &[callee, list])
}

/// `expr;`
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn expr_statement<T: SyntaxTree + ?Sized>(tree: &mut T, expr: NodeId) -> Result<NodeId, TreeError> {
    node(tree, NodeKind::ExprStatement, "", &[expr])
}

/// `return expr;`
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn return_statement<T: SyntaxTree + ?Sized>(tree: &mut T, expr: NodeId) -> Result<NodeId, TreeError> {
    node(tree, NodeKind::Return, "", &[expr])
}

/// `{ statements }`
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn block<T: SyntaxTree + ?Sized>(tree: &mut T, statements: &[NodeId]) -> Result<NodeId, TreeError> {
    node(tree, NodeKind::Block, "", statements)
}

/// `catch (Type name) { }`
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn catch_section<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    type_text: &str,
    name: &str,
) -> Result<NodeId, TreeError> {
    let param = parameter(tree, type_text, name)?;
    let body = block(tree, &[])?;
    node(tree, NodeKind::Catch, "", &[param, body])
}

/// `new Type[]{elements}`
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn new_array<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    array_type: &str,
    elements: &[NodeId],
) -> Result<NodeId, TreeError> {
    let ty = tree.create(NodeKind::TypeRef, array_type);
    let init = node(tree, NodeKind::ArrayInit, "", elements)?;
    node(tree, NodeKind::NewArray, "", &[ty, init])
}

/// `Type name [= init];`
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn local_var<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    type_text: &str,
    name: &str,
    init: Option<NodeId>,
) -> Result<NodeId, TreeError> {
    let ty = tree.create(NodeKind::TypeRef, type_text);
    let n = tree.create(NodeKind::Name, name);
    let mut children = vec![ty, n];
    children.extend(init);
    node(tree, NodeKind::LocalVar, "", &children)
}

/// `name = value`
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn assignment<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    name: &str,
    value: NodeId,
) -> Result<NodeId, TreeError> {
    let target = reference(tree, None, name)?;
    node(tree, NodeKind::Assignment, "", &[target, value])
}

/// Empty constructor `modifiers Name() { }`
///
/// # Errors
/// Propagates host refusal to edit fresh nodes.
pub fn constructor<T: SyntaxTree + ?Sized>(
    tree: &mut T,
    modifiers: &str,
    name: &str,
) -> Result<NodeId, TreeError> {
    let mods = tree.create(NodeKind::Modifiers, modifiers);
    let n = tree.create(NodeKind::Name, name);
    let params = tree.create(NodeKind::ParameterList, "");
    let throws = tree.create(NodeKind::ThrowsList, "");
    let body = block(tree, &[])?;
    node(tree, NodeKind::Constructor, "", &[mods, n, params, throws, body])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTree;

    #[test]
    fn test_catch_section_renders() {
        let mut tree = MemoryTree::new();
        let c = catch_section(&mut tree, "IOException", "e").unwrap();
        assert_eq!(tree.render(c), "catch (IOException e) { }");
    }

    #[test]
    fn test_new_array_renders() {
        let mut tree = MemoryTree::new();
        let elems: Vec<_> = ["1", "2"].iter().map(|t| expression(&mut tree, t)).collect();
        let arr = new_array(&mut tree, "int[]", &elems).unwrap();
        assert_eq!(tree.render(arr), "new int[]{1, 2}");
    }

    #[test]
    fn test_qualified_call_statement() {
        let mut tree = MemoryTree::new();
        let q = expression(&mut tree, "obj");
        let callee = reference(&mut tree, Some(q), "run").unwrap();
        let arg = expression(&mut tree, "1");
        let c = call(&mut tree, callee, &[arg]).unwrap();
        let s = expr_statement(&mut tree, c).unwrap();
        assert_eq!(tree.render(s), "obj.run(1);");
    }

    #[test]
    fn test_constructor_renders() {
        let mut tree = MemoryTree::new();
        let c = constructor(&mut tree, "public", "Child").unwrap();
        assert_eq!(tree.render(c), "public Child() { }");
    }
}
