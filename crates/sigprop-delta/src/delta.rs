//! Signature deltas
//!
//! Provides [`SignatureDelta`], the immutable description of how one
//! declaration's signature changes, and [`DeltaBuilder`] to construct it
//! against the current state of a tree.

use crate::error::DeltaError;
use crate::parameter::{ExceptionDelta, ParameterDelta};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use sigprop_tree::{Fingerprint, NodeId, SignatureView, SyntaxTree, Visibility};

/// What a propagated caller receives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Propagation {
    /// Insert the new parameters into the caller's own signature
    pub parameters: bool,
    /// Insert the new exceptions into the caller's throws list
    pub exceptions: bool,
}

/// Description of a pending signature change
///
/// # Invariants
/// - Every `Some` old index in `parameters`/`exceptions` is unique and in
///   range of the old lists
/// - `fingerprint` matches the declaration the delta was built against
/// - Only the propagation sets and `propagate_visibility` change after build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureDelta {
    target: NodeId,
    old: SignatureView,
    new_name: String,
    new_visibility: Visibility,
    new_return_type: Option<String>,
    parameters: Vec<ParameterDelta>,
    exceptions: Vec<ExceptionDelta>,
    to_remove: Vec<bool>,
    generate_delegate: bool,
    propagate_to_callers: IndexMap<NodeId, Propagation>,
    propagate_to_overriders: IndexSet<NodeId>,
    propagate_visibility: bool,
    fingerprint: Fingerprint,
}

impl SignatureDelta {
    /// Declaration being changed
    #[inline]
    #[must_use]
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Signature before the change
    #[inline]
    #[must_use]
    pub fn old_signature(&self) -> &SignatureView {
        &self.old
    }

    /// Old declaration name
    #[inline]
    #[must_use]
    pub fn old_name(&self) -> &str {
        &self.old.name
    }

    /// New declaration name
    #[inline]
    #[must_use]
    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    /// Old access level
    #[inline]
    #[must_use]
    pub fn old_visibility(&self) -> Visibility {
        self.old.visibility
    }

    /// New access level
    #[inline]
    #[must_use]
    pub fn new_visibility(&self) -> Visibility {
        self.new_visibility
    }

    /// New return type, `None` for constructors
    #[inline]
    #[must_use]
    pub fn new_return_type(&self) -> Option<&str> {
        self.new_return_type.as_deref()
    }

    /// New parameter list
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[ParameterDelta] {
        &self.parameters
    }

    /// New exception list
    #[inline]
    #[must_use]
    pub fn exceptions(&self) -> &[ExceptionDelta] {
        &self.exceptions
    }

    /// Mask over old parameter positions that have no new counterpart
    #[inline]
    #[must_use]
    pub fn to_remove(&self) -> &[bool] {
        &self.to_remove
    }

    /// Whether the old signature survives as a forwarding stub
    #[inline]
    #[must_use]
    pub fn generate_delegate(&self) -> bool {
        self.generate_delegate
    }

    /// Whether overriders take the new visibility verbatim
    #[inline]
    #[must_use]
    pub fn propagate_visibility(&self) -> bool {
        self.propagate_visibility
    }

    /// Fingerprint of the declaration at build time
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Callers receiving new parameters and/or exceptions
    #[inline]
    #[must_use]
    pub fn propagate_to_callers(&self) -> &IndexMap<NodeId, Propagation> {
        &self.propagate_to_callers
    }

    /// Extra overriding declarations receiving new parameters/exceptions
    #[inline]
    #[must_use]
    pub fn propagate_to_overriders(&self) -> &IndexSet<NodeId> {
        &self.propagate_to_overriders
    }

    /// Propagation settings for one caller
    #[must_use]
    pub fn propagation_for(&self, caller: NodeId) -> Option<Propagation> {
        self.propagate_to_callers.get(&caller).copied()
    }

    /// Whether `caller` receives the new parameters
    #[must_use]
    pub fn receives_parameters(&self, caller: NodeId) -> bool {
        self.propagation_for(caller).is_some_and(|p| p.parameters)
    }

    /// Whether `caller` receives the new exceptions
    #[must_use]
    pub fn receives_exceptions(&self, caller: NodeId) -> bool {
        self.propagation_for(caller).is_some_and(|p| p.exceptions)
    }

    /// Extend the caller propagation set
    ///
    /// Must happen before the apply transaction opens.
    pub fn propagate_to_caller(&mut self, caller: NodeId, propagation: Propagation) {
        let entry = self.propagate_to_callers.entry(caller).or_default();
        entry.parameters |= propagation.parameters;
        entry.exceptions |= propagation.exceptions;
    }

    /// Extend the overrider propagation set
    pub fn propagate_to_overrider(&mut self, overrider: NodeId) {
        self.propagate_to_overriders.insert(overrider);
    }

    /// Late-bind the visibility propagation decision
    pub fn set_propagate_visibility(&mut self, enabled: bool) {
        self.propagate_visibility = enabled;
    }

    /// Check the index invariants a builder guarantees
    ///
    /// Deltas read back from storage skip the builder, so they are checked
    /// again before use.
    ///
    /// # Errors
    /// Returns error if an old index is out of range or repeated, or the
    /// removal mask disagrees with the parameter list.
    pub fn validate(&self) -> Result<(), DeltaError> {
        check_indices(
            "parameter",
            self.parameters.iter().map(ParameterDelta::old_index),
            self.old.parameters.len(),
        )?;
        check_indices(
            "exception",
            self.exceptions.iter().map(ExceptionDelta::old_index),
            self.old.exceptions.len(),
        )?;
        let consistent = self.to_remove.len() == self.old.parameters.len()
            && self.to_remove.iter().enumerate().all(|(i, removed)| {
                *removed != self.parameters.iter().any(|p| p.old_index() == Some(i))
            });
        if !consistent {
            return Err(DeltaError::InvalidOperation {
                operation: "apply a removal mask that disagrees with the parameters".to_string(),
                target: self.target,
            });
        }
        Ok(())
    }

    /// Verify the delta is well formed and still describes the declaration in `tree`
    ///
    /// # Errors
    /// Returns error if [`validate`](Self::validate) fails or the
    /// declaration's signature changed since build.
    pub fn validate_base<T: SyntaxTree + ?Sized>(&self, tree: &T) -> Result<(), DeltaError> {
        self.validate()?;
        let actual = Fingerprint::of_declaration(tree, self.target).map_err(|source| {
            DeltaError::InvalidTarget {
                target: self.target,
                source,
            }
        })?;
        if actual != self.fingerprint {
            return Err(DeltaError::BaseMismatch {
                expected: self.fingerprint,
                actual,
            });
        }
        Ok(())
    }

    // ---- derived classification ----

    /// Name differs
    #[inline]
    #[must_use]
    pub fn is_name_changed(&self) -> bool {
        self.new_name != self.old.name
    }

    /// Parameters were added, removed or reordered
    #[must_use]
    pub fn is_parameter_set_or_order_changed(&self) -> bool {
        self.parameters.len() != self.old.parameters.len()
            || self
                .parameters
                .iter()
                .enumerate()
                .any(|(i, p)| p.old_index() != Some(i))
    }

    /// A kept parameter was renamed
    #[must_use]
    pub fn is_parameter_names_changed(&self) -> bool {
        self.parameters.iter().any(|p| {
            p.old_index()
                .and_then(|i| self.old.parameters.get(i))
                .is_some_and(|old| old.name != p.name())
        })
    }

    /// A kept parameter changed type
    #[must_use]
    pub fn is_parameter_types_changed(&self) -> bool {
        self.parameters.iter().any(|p| {
            p.old_index()
                .and_then(|i| self.old.parameters.get(i))
                .is_some_and(|old| old.type_text != p.type_text())
        })
    }

    /// Exceptions were added, removed, reordered or retyped
    #[must_use]
    pub fn is_exception_set_or_order_changed(&self) -> bool {
        self.exceptions.len() != self.old.exceptions.len()
            || self.exceptions.iter().enumerate().any(|(i, e)| {
                e.old_index() != Some(i)
                    || self.old.exceptions.get(i).map(String::as_str) != Some(e.type_text())
            })
    }

    /// Return type differs
    #[inline]
    #[must_use]
    pub fn is_return_type_changed(&self) -> bool {
        self.new_return_type != self.old.return_type
    }

    /// Visibility differs
    #[inline]
    #[must_use]
    pub fn is_visibility_changed(&self) -> bool {
        self.new_visibility != self.old.visibility
    }

    /// Old last parameter was variadic
    #[inline]
    #[must_use]
    pub fn was_vararg(&self) -> bool {
        self.old.is_vararg()
    }

    /// New last parameter is variadic
    #[must_use]
    pub fn obtains_varargs(&self) -> bool {
        self.parameters.last().is_some_and(ParameterDelta::is_vararg)
    }

    /// New variadic parameter maps to an old parameter
    #[must_use]
    pub fn retains_varargs(&self) -> bool {
        self.obtains_varargs() && self.parameters.last().is_some_and(|p| !p.is_new())
    }

    /// New variadic parameter maps to an old fixed-arity parameter
    #[must_use]
    pub fn array_to_varargs(&self) -> bool {
        self.retains_varargs()
            && self
                .parameters
                .last()
                .and_then(ParameterDelta::old_index)
                .and_then(|i| self.old.parameters.get(i))
                .is_some_and(|old| !old.type_text.ends_with("..."))
    }

    /// Call sites must switch between variadic and array form
    #[must_use]
    pub fn is_vararg_shape_changed(&self) -> bool {
        self.array_to_varargs() || (self.was_vararg() && !self.retains_varargs())
    }

    /// Whether anything at all changes
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.is_name_changed()
            || self.is_parameter_set_or_order_changed()
            || self.is_parameter_names_changed()
            || self.is_parameter_types_changed()
            || self.is_exception_set_or_order_changed()
            || self.is_return_type_changed()
            || self.is_visibility_changed()
    }

    /// Whether call sites need rewriting
    #[must_use]
    pub fn needs_call_rewrite(&self) -> bool {
        !self.generate_delegate
            && (self.is_name_changed()
                || self.is_parameter_set_or_order_changed()
                || self.is_vararg_shape_changed()
                || self.is_exception_set_or_order_changed()
                || self.is_visibility_changed())
    }

    /// Whether any caller receives propagated parameters or exceptions
    #[inline]
    #[must_use]
    pub fn is_propagation_enabled(&self) -> bool {
        !self.propagate_to_callers.is_empty()
    }

    /// New parameters without a trailing new vararg
    #[must_use]
    pub fn created_parameters_without_varargs(&self) -> Vec<&ParameterDelta> {
        self.parameters
            .iter()
            .filter(|p| p.is_new() && !p.is_vararg())
            .collect()
    }

    /// Exceptions that were not declared before
    #[must_use]
    pub fn added_exceptions(&self) -> Vec<&ExceptionDelta> {
        self.exceptions.iter().filter(|e| e.is_new()).collect()
    }

    /// Type texts of the new exception list
    #[must_use]
    pub fn new_exception_types(&self) -> Vec<&str> {
        self.exceptions.iter().map(ExceptionDelta::type_text).collect()
    }

    /// Old parameter name at position `index`
    #[must_use]
    pub fn old_parameter_name(&self, index: usize) -> Option<&str> {
        self.old.parameters.get(index).map(|p| p.name.as_str())
    }

    /// Old parameter type at position `index`
    #[must_use]
    pub fn old_parameter_type(&self, index: usize) -> Option<&str> {
        self.old.parameters.get(index).map(|p| p.type_text.as_str())
    }

    /// Old parameter count
    #[inline]
    #[must_use]
    pub fn old_parameter_count(&self) -> usize {
        self.old.parameters.len()
    }
}

/// Builder for [`SignatureDelta`]
///
/// Starts from the declaration's current signature; every setter describes
/// the new state.
#[derive(Debug, Clone)]
pub struct DeltaBuilder {
    target: NodeId,
    old: SignatureView,
    fingerprint: Fingerprint,
    name: Option<String>,
    visibility: Option<Visibility>,
    return_type: Option<String>,
    parameters: Vec<ParameterDelta>,
    exceptions: Vec<ExceptionDelta>,
    generate_delegate: bool,
    callers: IndexMap<NodeId, Propagation>,
    overriders: IndexSet<NodeId>,
    propagate_visibility: bool,
}

impl DeltaBuilder {
    /// Start from the current signature of `target`
    ///
    /// # Errors
    /// Returns error if `target` is not a well-formed declaration.
    pub fn for_declaration<T: SyntaxTree + ?Sized>(tree: &T, target: NodeId) -> Result<Self, DeltaError> {
        let invalid = |source| DeltaError::InvalidTarget { target, source };
        let old = SignatureView::read(tree, target).map_err(invalid)?;
        let fingerprint = Fingerprint::of_declaration(tree, target).map_err(invalid)?;
        let parameters = old
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| ParameterDelta::existing(i, &p.name, &p.type_text))
            .collect();
        let exceptions = old
            .exceptions
            .iter()
            .enumerate()
            .map(|(i, e)| ExceptionDelta::existing(i, e))
            .collect();
        Ok(Self {
            target,
            return_type: old.return_type.clone(),
            old,
            fingerprint,
            name: None,
            visibility: None,
            parameters,
            exceptions,
            generate_delegate: false,
            callers: IndexMap::new(),
            overriders: IndexSet::new(),
            propagate_visibility: false,
        })
    }

    /// Set new name
    #[inline]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set new visibility
    #[inline]
    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Set new return type
    #[inline]
    #[must_use]
    pub fn return_type(mut self, type_text: impl Into<String>) -> Self {
        self.return_type = Some(type_text.into());
        self
    }

    /// Replace the whole new parameter list
    #[inline]
    #[must_use]
    pub fn parameters(mut self, parameters: Vec<ParameterDelta>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Append a parameter to the new list
    #[inline]
    #[must_use]
    pub fn add_parameter(mut self, parameter: ParameterDelta) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Drop the parameter mapped to old position `old_index`
    #[inline]
    #[must_use]
    pub fn remove_parameter(mut self, old_index: usize) -> Self {
        self.parameters.retain(|p| p.old_index() != Some(old_index));
        self
    }

    /// Replace the whole new exception list
    #[inline]
    #[must_use]
    pub fn exceptions(mut self, exceptions: Vec<ExceptionDelta>) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Append an exception to the new list
    #[inline]
    #[must_use]
    pub fn add_exception(mut self, type_text: impl Into<String>) -> Self {
        self.exceptions.push(ExceptionDelta::added(type_text));
        self
    }

    /// Keep the old signature as a forwarding stub
    #[inline]
    #[must_use]
    pub fn generate_delegate(mut self, enabled: bool) -> Self {
        self.generate_delegate = enabled;
        self
    }

    /// Propagate new parameters and/or exceptions into `caller`
    #[inline]
    #[must_use]
    pub fn propagate_to_caller(mut self, caller: NodeId, propagation: Propagation) -> Self {
        self.callers.insert(caller, propagation);
        self
    }

    /// Propagate new parameters/exceptions into an extra overrider
    #[inline]
    #[must_use]
    pub fn propagate_to_overrider(mut self, overrider: NodeId) -> Self {
        self.overriders.insert(overrider);
        self
    }

    /// Apply new visibility verbatim to overriders
    #[inline]
    #[must_use]
    pub fn propagate_visibility(mut self, enabled: bool) -> Self {
        self.propagate_visibility = enabled;
        self
    }

    /// Build delta
    ///
    /// # Errors
    /// Returns error if an old index is duplicated or out of range, a
    /// variadic parameter is not last, or a constructor would be renamed or
    /// given a return type.
    pub fn build(self) -> Result<SignatureDelta, DeltaError> {
        check_indices(
            "parameter",
            self.parameters.iter().map(ParameterDelta::old_index),
            self.old.parameters.len(),
        )?;
        check_indices(
            "exception",
            self.exceptions.iter().map(ExceptionDelta::old_index),
            self.old.exceptions.len(),
        )?;

        let last = self.parameters.len().saturating_sub(1);
        if self
            .parameters
            .iter()
            .enumerate()
            .any(|(i, p)| p.is_vararg() && i != last)
        {
            return Err(self.invalid("variadic parameter must be last"));
        }

        let name = self.name.clone().unwrap_or_else(|| self.old.name.clone());
        if self.old.is_constructor() {
            if name != self.old.name {
                return Err(self.invalid("rename constructor"));
            }
            if self.return_type.is_some() {
                return Err(self.invalid("give constructor a return type"));
            }
        }

        let mut to_remove = vec![true; self.old.parameters.len()];
        for index in self.parameters.iter().filter_map(ParameterDelta::old_index) {
            to_remove[index] = false;
        }

        Ok(SignatureDelta {
            target: self.target,
            new_name: name,
            new_visibility: self.visibility.unwrap_or(self.old.visibility),
            new_return_type: self.return_type,
            old: self.old,
            parameters: self.parameters,
            exceptions: self.exceptions,
            to_remove,
            generate_delegate: self.generate_delegate,
            propagate_to_callers: self.callers,
            propagate_to_overriders: self.overriders,
            propagate_visibility: self.propagate_visibility,
            fingerprint: self.fingerprint,
        })
    }

    fn invalid(&self, operation: &str) -> DeltaError {
        DeltaError::InvalidOperation {
            operation: operation.to_string(),
            target: self.target,
        }
    }
}

fn check_indices(
    what: &'static str,
    indices: impl Iterator<Item = Option<usize>>,
    len: usize,
) -> Result<(), DeltaError> {
    let mut seen = vec![false; len];
    for (position, old_index) in indices.enumerate() {
        let Some(old_index) = old_index else {
            continue;
        };
        let slot = seen.get_mut(old_index).ok_or(DeltaError::IndexOutOfRange {
            what,
            position,
            old_index,
            len,
        })?;
        if *slot {
            return Err(DeltaError::DuplicateIndex { what, old_index });
        }
        *slot = true;
    }
    Ok(())
}
