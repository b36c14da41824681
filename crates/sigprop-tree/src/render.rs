//! Java-like source rendering
//!
//! Renders any [`SyntaxTree`] subtree on a single line. The output is used
//! for fingerprints, diagnostics and test assertions, never re-parsed.

use crate::node::{NodeId, NodeKind};
use crate::tree::SyntaxTree;

/// Render subtree as single-line source text
#[must_use]
pub fn render<T: SyntaxTree + ?Sized>(tree: &T, node: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, node, &mut out);
    out
}

/// Render only the signature part of a declaration (no docs, no body)
#[must_use]
pub fn render_header<T: SyntaxTree + ?Sized>(tree: &T, decl: NodeId) -> String {
    let mut out = String::new();
    write_declaration(tree, decl, &mut out, false);
    out
}

fn join<T: SyntaxTree + ?Sized>(tree: &T, nodes: &[NodeId], sep: &str, out: &mut String) {
    for (i, n) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        write_node(tree, *n, out);
    }
}

fn write_child<T: SyntaxTree + ?Sized>(tree: &T, node: NodeId, kind: NodeKind, out: &mut String) {
    if let Some(child) = tree.child_of_kind(node, kind) {
        write_node(tree, child, out);
    }
}

fn write_block_of<T: SyntaxTree + ?Sized>(tree: &T, node: NodeId, out: &mut String) {
    match tree.child_of_kind(node, NodeKind::Block) {
        Some(block) => write_node(tree, block, out),
        None => out.push_str("{ }"),
    }
}

fn write_declaration<T: SyntaxTree + ?Sized>(tree: &T, decl: NodeId, out: &mut String, full: bool) {
    if full {
        if let Some(doc) = tree.child_of_kind(decl, NodeKind::DocComment) {
            write_node(tree, doc, out);
            out.push(' ');
        }
    }
    if let Some(contract) = tree.child_of_kind(decl, NodeKind::Contract) {
        write_node(tree, contract, out);
        out.push(' ');
    }
    if let Some(mods) = tree.child_of_kind(decl, NodeKind::Modifiers) {
        if !tree.text(mods).is_empty() {
            out.push_str(tree.text(mods));
            out.push(' ');
        }
    }
    if let Some(ret) = tree.child_of_kind(decl, NodeKind::TypeRef) {
        out.push_str(tree.text(ret));
        out.push(' ');
    }
    write_child(tree, decl, NodeKind::Name, out);
    out.push('(');
    write_child(tree, decl, NodeKind::ParameterList, out);
    out.push(')');
    if let Some(throws) = tree.child_of_kind(decl, NodeKind::ThrowsList) {
        if !tree.children(throws).is_empty() {
            out.push_str(" throws ");
            write_node(tree, throws, out);
        }
    }
    if full {
        match tree.child_of_kind(decl, NodeKind::Block) {
            Some(body) => {
                out.push(' ');
                write_node(tree, body, out);
            }
            None => out.push(';'),
        }
    }
}

fn write_node<T: SyntaxTree + ?Sized>(tree: &T, node: NodeId, out: &mut String) {
    let children = tree.children(node);
    match tree.kind(node) {
        NodeKind::File => join(tree, &children, "\n", out),
        NodeKind::Class => {
            let members: Vec<_> = children
                .iter()
                .copied()
                .filter(|c| tree.kind(*c) != NodeKind::Modifiers)
                .collect();
            if !tree.text(node).is_empty() {
                if let Some(mods) = tree.child_of_kind(node, NodeKind::Modifiers) {
                    if !tree.text(mods).is_empty() {
                        out.push_str(tree.text(mods));
                        out.push(' ');
                    }
                }
                out.push_str("class ");
                out.push_str(tree.text(node));
                out.push(' ');
            }
            out.push('{');
            for m in members {
                out.push(' ');
                write_node(tree, m, out);
            }
            out.push_str(" }");
        }
        NodeKind::Method | NodeKind::Constructor => write_declaration(tree, node, out, true),
        NodeKind::Field | NodeKind::LocalVar => {
            if let Some(mods) = tree.child_of_kind(node, NodeKind::Modifiers) {
                if !tree.text(mods).is_empty() {
                    out.push_str(tree.text(mods));
                    out.push(' ');
                }
            }
            write_child(tree, node, NodeKind::TypeRef, out);
            out.push(' ');
            write_child(tree, node, NodeKind::Name, out);
            let init = children.iter().copied().find(|c| {
                !matches!(
                    tree.kind(*c),
                    NodeKind::Modifiers | NodeKind::TypeRef | NodeKind::Name
                )
            });
            if let Some(init) = init {
                out.push_str(" = ");
                write_node(tree, init, out);
            }
            out.push(';');
        }
        NodeKind::Parameter => {
            let ty = tree
                .child_of_kind(node, NodeKind::TypeRef)
                .map(|t| tree.text(t))
                .unwrap_or_default();
            if !ty.is_empty() {
                out.push_str(ty);
                out.push(' ');
            }
            write_child(tree, node, NodeKind::Name, out);
        }
        NodeKind::ParameterList | NodeKind::ArgumentList | NodeKind::ThrowsList => {
            join(tree, &children, ", ", out);
        }
        NodeKind::ResourceList => join(tree, &children, "; ", out),
        NodeKind::Block => {
            out.push('{');
            for s in &children {
                out.push(' ');
                write_node(tree, *s, out);
            }
            out.push_str(" }");
        }
        NodeKind::ExprStatement => {
            join(tree, &children, "", out);
            out.push(';');
        }
        NodeKind::Return => {
            out.push_str("return");
            for c in &children {
                out.push(' ');
                write_node(tree, *c, out);
            }
            out.push(';');
        }
        NodeKind::Throw => {
            out.push_str("throw ");
            join(tree, &children, "", out);
            out.push(';');
        }
        NodeKind::Try => {
            out.push_str("try ");
            if let Some(resources) = tree.child_of_kind(node, NodeKind::ResourceList) {
                out.push('(');
                write_node(tree, resources, out);
                out.push_str(") ");
            }
            write_block_of(tree, node, out);
            for c in &children {
                if matches!(tree.kind(*c), NodeKind::Catch | NodeKind::Finally) {
                    out.push(' ');
                    write_node(tree, *c, out);
                }
            }
        }
        NodeKind::Catch => {
            out.push_str("catch (");
            write_child(tree, node, NodeKind::Parameter, out);
            out.push_str(") ");
            write_block_of(tree, node, out);
        }
        NodeKind::Finally => {
            out.push_str("finally ");
            write_block_of(tree, node, out);
        }
        NodeKind::Call => {
            write_child(tree, node, NodeKind::Reference, out);
            out.push('(');
            write_child(tree, node, NodeKind::ArgumentList, out);
            out.push(')');
        }
        NodeKind::Reference => {
            if let Some(qualifier) = children.first() {
                write_node(tree, *qualifier, out);
                out.push('.');
            }
            out.push_str(tree.text(node));
        }
        NodeKind::New => {
            out.push_str("new ");
            write_child(tree, node, NodeKind::TypeRef, out);
            out.push('(');
            write_child(tree, node, NodeKind::ArgumentList, out);
            out.push(')');
            if let Some(body) = tree.child_of_kind(node, NodeKind::Class) {
                out.push(' ');
                write_node(tree, body, out);
            }
        }
        NodeKind::NewArray => {
            out.push_str("new ");
            write_child(tree, node, NodeKind::TypeRef, out);
            write_child(tree, node, NodeKind::ArrayInit, out);
        }
        NodeKind::ArrayInit => {
            out.push('{');
            join(tree, &children, ", ", out);
            out.push('}');
        }
        NodeKind::Assignment => {
            if let [target, value, ..] = children.as_slice() {
                write_node(tree, *target, out);
                out.push_str(" = ");
                write_node(tree, *value, out);
            }
        }
        NodeKind::Lambda => {
            out.push('(');
            write_child(tree, node, NodeKind::ParameterList, out);
            out.push_str(") -> ");
            if let Some(body) = children.get(1) {
                write_node(tree, *body, out);
            }
        }
        NodeKind::DocComment => {
            out.push_str("/**");
            if !tree.text(node).is_empty() {
                out.push(' ');
                out.push_str(tree.text(node));
            }
            for p in &children {
                out.push_str(" @param ");
                out.push_str(tree.text(*p));
            }
            out.push_str(" */");
        }
        NodeKind::Contract => {
            out.push_str("@Contract(\"");
            out.push_str(tree.text(node));
            out.push_str("\")");
        }
        NodeKind::Separator => {}
        NodeKind::Modifiers
        | NodeKind::Name
        | NodeKind::TypeRef
        | NodeKind::Expression
        | NodeKind::MethodRef
        | NodeKind::DocParam => out.push_str(tree.text(node)),
    }
}
