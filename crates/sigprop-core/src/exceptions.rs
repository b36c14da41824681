//! Exception handling at call sites
//!
//! Provides [`ExceptionReconciler`]. After the declaration's throws list
//! changed, a call site either sits in a try statement whose catch clauses
//! are patched, or its statement is wrapped in a new try.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::host::SemanticModel;
use crate::scope::{declared_names, unique_name, visible_variables};
use sigprop_tree::{
    enclosing_statement, factory, variable_initializer, variable_parts, NodeId, NodeKind,
    SyntaxTree,
};
use std::collections::HashSet;

/// Edits made at one site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExceptionFix {
    /// Catch clauses added
    pub added_catches: usize,
    /// Catch clauses removed as redundant
    pub removed_catches: usize,
    /// Statement wrapped in a new try
    pub wrapped: bool,
    /// Empty try replaced by its body
    pub unwrapped: bool,
    /// Checked exceptions left unhandled because no statement encloses the site
    pub unhandled: usize,
}

/// Patches try statements around call sites
pub struct ExceptionReconciler<'a> {
    semantics: &'a dyn SemanticModel,
    catch_name: &'a str,
    unwrap_empty_try: bool,
}

impl<'a> ExceptionReconciler<'a> {
    /// Create reconciler
    #[must_use]
    pub fn new(semantics: &'a dyn SemanticModel, config: &'a EngineConfig) -> Self {
        Self {
            semantics,
            catch_name: &config.catch_parameter_name,
            unwrap_empty_try: config.unwrap_empty_try,
        }
    }

    /// Make `call`, which now throws `thrown`, compile again
    ///
    /// # Errors
    /// Returns error if the tree refuses an edit.
    pub fn fix_call_site(
        &self,
        tree: &mut dyn SyntaxTree,
        call: NodeId,
        thrown: &[String],
    ) -> Result<ExceptionFix, EngineError> {
        let checked: Vec<&String> = thrown
            .iter()
            .filter(|t| self.semantics.is_checked_exception(t))
            .collect();

        if let Some(try_stmt) = enclosing_try(&*tree, call) {
            let mut fix = ExceptionFix::default();
            let unhandled: Vec<&String> = checked
                .iter()
                .copied()
                .filter(|e| !self.is_handled(&*tree, call, e))
                .collect();
            fix.added_catches = self.add_catches(tree, try_stmt, call, &unhandled)?;
            fix.removed_catches = self.remove_redundant_catches(tree, try_stmt, thrown)?;
            fix.unwrapped = self.unwrap_if_empty(tree, try_stmt)?;
            return Ok(fix);
        }

        let unhandled: Vec<&String> = checked
            .into_iter()
            .filter(|e| !self.is_handled(&*tree, call, e))
            .collect();
        if unhandled.is_empty() {
            return Ok(ExceptionFix::default());
        }

        let stmt = match enclosing_statement(&*tree, call) {
            Some(stmt) => stmt,
            None => {
                self.expand_lambda(tree, call)?;
                match enclosing_statement(&*tree, call) {
                    Some(stmt) => stmt,
                    None => {
                        tracing::warn!("no statement to wrap around {}", call);
                        return Ok(ExceptionFix {
                            unhandled: unhandled.len(),
                            ..ExceptionFix::default()
                        });
                    }
                }
            }
        };
        let try_stmt = self.wrap_in_try(tree, stmt)?;
        let added_catches = self.add_catches(tree, try_stmt, call, &unhandled)?;
        Ok(ExceptionFix {
            added_catches,
            wrapped: true,
            ..ExceptionFix::default()
        })
    }

    /// Checked exceptions of `thrown` that `call` cannot be made to handle
    ///
    /// Non-empty only for sites outside any statement or lambda, such as a
    /// field initializer, where no try can be placed.
    pub(crate) fn unwrappable(&self, tree: &dyn SyntaxTree, call: NodeId, thrown: &[&str]) -> Vec<String> {
        let in_lambda = tree
            .nearest_ancestor(call, &|k: NodeKind| matches!(k, NodeKind::Lambda | NodeKind::Class))
            .is_some_and(|n| tree.kind(n) == NodeKind::Lambda);
        if in_lambda || enclosing_try(tree, call).is_some() || enclosing_statement(tree, call).is_some() {
            return Vec::new();
        }
        thrown
            .iter()
            .filter(|t| self.semantics.is_checked_exception(t) && !self.is_handled(tree, call, t))
            .map(|t| (*t).to_string())
            .collect()
    }

    /// Whether `exception` thrown at `site` is caught or declared on the way out
    fn is_handled(&self, tree: &dyn SyntaxTree, site: NodeId, exception: &str) -> bool {
        let mut child = site;
        for ancestor in tree.ancestors(site) {
            match tree.kind(ancestor) {
                NodeKind::Try if tree.child_of_kind(ancestor, NodeKind::Block) == Some(child) => {
                    let caught = catch_types(tree, ancestor)
                        .iter()
                        .any(|(_, t)| self.semantics.is_subtype(exception, t));
                    if caught {
                        return true;
                    }
                }
                NodeKind::Method | NodeKind::Constructor => {
                    return tree
                        .child_of_kind(ancestor, NodeKind::ThrowsList)
                        .is_some_and(|list| {
                            tree.children(list)
                                .into_iter()
                                .any(|t| self.semantics.is_subtype(exception, tree.text(t)))
                        });
                }
                NodeKind::Lambda | NodeKind::Class => return false,
                _ => {}
            }
            child = ancestor;
        }
        false
    }

    fn add_catches(
        &self,
        tree: &mut dyn SyntaxTree,
        try_stmt: NodeId,
        site: NodeId,
        exceptions: &[&String],
    ) -> Result<usize, EngineError> {
        if exceptions.is_empty() {
            return Ok(0);
        }
        let scope_root = tree
            .nearest_ancestor(try_stmt, &|k: NodeKind| {
                matches!(k, NodeKind::Method | NodeKind::Constructor | NodeKind::Lambda | NodeKind::Class)
            })
            .unwrap_or(try_stmt);
        let mut taken: HashSet<String> = declared_names(&*tree, scope_root);
        taken.extend(
            visible_variables(&*tree, self.semantics, site)
                .into_iter()
                .map(|v| v.name),
        );

        let finally = tree.child_of_kind(try_stmt, NodeKind::Finally);
        for exception in exceptions {
            let name = unique_name(self.catch_name, &taken);
            taken.insert(name.clone());
            let catch = factory::catch_section(tree, exception, &name)?;
            tree.insert_before(try_stmt, finally, catch)?;
            tracing::debug!("added catch ({} {}) to {}", exception, name, try_stmt);
        }
        Ok(exceptions.len())
    }

    /// Drop checked catches nothing in the body throws any more
    ///
    /// `site_thrown` is what the rewritten call throws now, whether or not
    /// the host already resolves it.
    fn remove_redundant_catches(
        &self,
        tree: &mut dyn SyntaxTree,
        try_stmt: NodeId,
        site_thrown: &[String],
    ) -> Result<usize, EngineError> {
        let Some(body) = tree.child_of_kind(try_stmt, NodeKind::Block) else {
            return Ok(0);
        };
        let mut thrown = self.thrown_in(&*tree, body);
        thrown.extend(site_thrown.iter().cloned());
        let mut removed = 0;
        for (catch, caught) in catch_types(&*tree, try_stmt) {
            if self.semantics.may_catch_unchecked(&caught) {
                continue;
            }
            let needed = thrown.iter().any(|t| {
                self.semantics.is_subtype(t, &caught) || self.semantics.is_subtype(&caught, t)
            });
            if !needed {
                tree.delete(catch)?;
                removed += 1;
                tracing::debug!("removed redundant catch of {} from {}", caught, try_stmt);
            }
        }
        Ok(removed)
    }

    /// Exceptions that may escape `node`
    fn thrown_in(&self, tree: &dyn SyntaxTree, node: NodeId) -> Vec<String> {
        match tree.kind(node) {
            NodeKind::Lambda | NodeKind::Class => Vec::new(),
            NodeKind::Try => {
                let caught = catch_types(tree, node);
                let mut out = Vec::new();
                for child in tree.children(node) {
                    let thrown = self.thrown_in(tree, child);
                    if tree.kind(child) == NodeKind::Block {
                        out.extend(thrown.into_iter().filter(|t| {
                            !caught.iter().any(|(_, c)| self.semantics.is_subtype(t, c))
                        }));
                    } else {
                        out.extend(thrown);
                    }
                }
                out
            }
            kind => {
                let mut out = if matches!(kind, NodeKind::Call | NodeKind::New | NodeKind::Throw) {
                    self.semantics.thrown_by(tree, node)
                } else {
                    Vec::new()
                };
                for child in tree.children(node) {
                    out.extend(self.thrown_in(tree, child));
                }
                out
            }
        }
    }

    fn unwrap_if_empty(&self, tree: &mut dyn SyntaxTree, try_stmt: NodeId) -> Result<bool, EngineError> {
        if !self.unwrap_empty_try {
            return Ok(false);
        }
        let leftovers = tree.children(try_stmt).into_iter().any(|c| {
            matches!(
                tree.kind(c),
                NodeKind::Catch | NodeKind::Finally | NodeKind::ResourceList
            )
        });
        let parent = tree.parent(try_stmt);
        let (Some(parent), Some(body)) = (parent, tree.child_of_kind(try_stmt, NodeKind::Block)) else {
            return Ok(false);
        };
        if leftovers || tree.kind(parent) != NodeKind::Block {
            return Ok(false);
        }
        for stmt in tree.children(body) {
            tree.insert_before(parent, Some(try_stmt), stmt)?;
        }
        tree.delete(try_stmt)?;
        tracing::debug!("unwrapped empty try {}", try_stmt);
        Ok(true)
    }

    /// Wrap `stmt` in `try { stmt }`, hoisting a local declaration out first
    fn wrap_in_try(&self, tree: &mut dyn SyntaxTree, stmt: NodeId) -> Result<NodeId, EngineError> {
        let parent = tree.parent(stmt).ok_or_else(|| {
            sigprop_tree::TreeError::malformed(stmt, tree.kind(stmt), "statement has no parent")
        })?;

        let mut wrapped = stmt;
        if tree.kind(stmt) == NodeKind::LocalVar {
            if let Some(init) = variable_initializer(&*tree, stmt) {
                let (type_text, name) = variable_parts(&*tree, stmt);
                let (type_text, name) = (type_text.to_string(), name.to_string());
                let declaration = factory::local_var(tree, &type_text, &name, None)?;
                tree.insert_before(parent, Some(stmt), declaration)?;
                let assignment = factory::assignment(tree, &name, init)?;
                let assign_stmt = factory::expr_statement(tree, assignment)?;
                tree.replace(stmt, assign_stmt)?;
                wrapped = assign_stmt;
            }
        }

        let body = factory::block(tree, &[])?;
        let try_stmt = factory::node(tree, NodeKind::Try, "", &[body])?;
        tree.insert_before(parent, Some(wrapped), try_stmt)?;
        tree.append(body, wrapped)?;
        Ok(try_stmt)
    }

    /// Turn the expression body of the lambda around `site` into a block
    fn expand_lambda(&self, tree: &mut dyn SyntaxTree, site: NodeId) -> Result<(), EngineError> {
        let Some(lambda) = tree.nearest_ancestor(site, &|k: NodeKind| k == NodeKind::Lambda) else {
            return Ok(());
        };
        let Some(body) = tree.children(lambda).get(1).copied() else {
            return Ok(());
        };
        if tree.kind(body) == NodeKind::Block {
            return Ok(());
        }
        let returns_void = match tree.kind(body) {
            NodeKind::Assignment => true,
            NodeKind::Call => self
                .semantics
                .resolve_reference(&*tree, body)
                .and_then(|decl| {
                    tree.children(decl)
                        .into_iter()
                        .find(|c| tree.kind(*c) == NodeKind::TypeRef)
                })
                .is_some_and(|ret| tree.text(ret) == "void"),
            _ => false,
        };
        tree.detach(body)?;
        let stmt = if returns_void {
            factory::expr_statement(tree, body)?
        } else {
            factory::return_statement(tree, body)?
        };
        let block = factory::block(tree, &[stmt])?;
        tree.append(lambda, block)?;
        Ok(())
    }
}

/// Nearest try statement whose body contains `node`
fn enclosing_try(tree: &dyn SyntaxTree, node: NodeId) -> Option<NodeId> {
    let mut child = node;
    for ancestor in tree.ancestors(node) {
        match tree.kind(ancestor) {
            NodeKind::Try if tree.child_of_kind(ancestor, NodeKind::Block) == Some(child) => {
                return Some(ancestor);
            }
            NodeKind::Method | NodeKind::Constructor | NodeKind::Lambda | NodeKind::Class => {
                return None;
            }
            _ => {}
        }
        child = ancestor;
    }
    None
}

/// `(catch node, caught type)` of each catch clause
fn catch_types(tree: &dyn SyntaxTree, try_stmt: NodeId) -> Vec<(NodeId, String)> {
    tree.children_of_kind(try_stmt, NodeKind::Catch)
        .into_iter()
        .map(|c| {
            let ty = tree
                .child_of_kind(c, NodeKind::Parameter)
                .map(|p| variable_parts(tree, p).0.to_string())
                .unwrap_or_default();
            (c, ty)
        })
        .collect()
}

/// Append exception types missing from the throws list of `decl`
///
/// # Errors
/// Returns error if the tree refuses an edit.
pub fn extend_throws_list(
    tree: &mut dyn SyntaxTree,
    semantics: &dyn SemanticModel,
    decl: NodeId,
    exceptions: &[&str],
) -> Result<usize, EngineError> {
    let Some(list) = tree.child_of_kind(decl, NodeKind::ThrowsList) else {
        return Ok(0);
    };
    let existing = tree.children(list);
    let mut desired: Vec<Option<NodeId>> = existing.iter().copied().map(Some).collect();
    let mut added = 0;
    for exception in exceptions {
        let declared = existing
            .iter()
            .any(|t| semantics.is_subtype(exception, tree.text(*t)));
        if declared {
            continue;
        }
        desired.push(Some(tree.create(NodeKind::TypeRef, exception)));
        added += 1;
    }
    if added > 0 {
        sigprop_reconcile::synchronize_list(tree, list, &desired, &[])?;
    }
    Ok(added)
}
