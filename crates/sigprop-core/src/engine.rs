//! Propagation engine
//!
//! Provides [`Engine`], the entry point tying classification, conflict
//! analysis, policy handling and the transactional apply phase together.
//!
//! A run is split in two halves so that hosts holding the tree behind a
//! lock can prepare under a shared borrow:
//! - [`Engine::prepare`] reads the tree and produces a [`Plan`] or a final
//!   [`RunOutcome`]
//! - [`Engine::apply`] executes a plan inside one [`WriteTransaction`]

use crate::binder::{zero_literal, DefaultValues};
use crate::classify::UsageClassifier;
use crate::config::{EngineConfig, ExecutionPolicy};
use crate::conflict::{ConflictAnalyzer, ConflictReport};
use crate::error::EngineError;
use crate::host::{Decision, PolicyHook, SearchProvider, SemanticModel};
use crate::outcome::{ApplySummary, RunOutcome};
use crate::transform::UsageTransformer;
use crate::usage::Usage;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use sigprop_delta::{DeltaError, SignatureDelta};
use sigprop_tree::{NodeId, ParameterView, SignatureView, SyntaxTree, WriteTransaction};

/// Everything decided before the tree is edited
#[derive(Debug, Clone)]
pub struct Plan {
    /// Usages to apply, in order
    pub usages: Vec<Usage>,

    /// Conflicts confirmed or avoided
    pub report: ConflictReport,

    /// Usage sites dropped because of their conflicts
    pub skipped: Vec<NodeId>,

    /// Default values chosen for new parameters
    pub defaults: DefaultValues,
}

/// Result of [`Engine::prepare`]
#[derive(Debug, Clone)]
pub enum Preparation {
    /// Ready to apply
    Ready(Plan),

    /// Run ends here without edits
    Stop(RunOutcome),
}

/// Signature-change propagation engine
pub struct Engine<'a> {
    config: EngineConfig,
    search: &'a dyn SearchProvider,
    semantics: &'a dyn SemanticModel,
    hook: Option<&'a dyn PolicyHook>,
}

impl<'a> Engine<'a> {
    /// Create engine over the host services
    #[must_use]
    pub fn new(
        config: EngineConfig,
        search: &'a dyn SearchProvider,
        semantics: &'a dyn SemanticModel,
    ) -> Self {
        Self {
            config,
            search,
            semantics,
            hook: None,
        }
    }

    /// With interactive hook
    #[must_use]
    pub fn with_hook(mut self, hook: &'a dyn PolicyHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply `delta` to the declaration `target`
    ///
    /// # Errors
    /// Returns error if the delta is stale or malformed, or if the tree
    /// refuses an edit (all edits of the run are rolled back).
    #[tracing::instrument(skip_all, fields(target = %target))]
    pub fn run(
        &self,
        tree: &mut dyn SyntaxTree,
        target: NodeId,
        delta: &SignatureDelta,
    ) -> Result<RunOutcome, EngineError> {
        tracing::info!("changing signature of '{}'", delta.old_name());
        match self.prepare(&*tree, target, delta)? {
            Preparation::Ready(plan) => self.apply(tree, delta, plan),
            Preparation::Stop(outcome) => {
                tracing::info!("stopped before editing: {}", describe(&outcome));
                Ok(outcome)
            }
        }
    }

    /// [`Engine::run`] on a tree shared behind a lock
    ///
    /// Preparation holds an upgradable read so other readers continue; the
    /// lock is upgraded only for the apply phase.
    ///
    /// # Errors
    /// Same as [`Engine::run`].
    pub fn run_shared<T: SyntaxTree>(
        &self,
        tree: &RwLock<T>,
        target: NodeId,
        delta: &SignatureDelta,
    ) -> Result<RunOutcome, EngineError> {
        let guard = tree.upgradable_read();
        let plan = match self.prepare(&*guard, target, delta)? {
            Preparation::Ready(plan) => plan,
            Preparation::Stop(outcome) => return Ok(outcome),
        };
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        self.apply(&mut *guard, delta, plan)
    }

    /// Classify, analyze and settle policy questions without editing
    ///
    /// # Errors
    /// Returns error if `target` is not the delta's declaration or the
    /// declaration changed since the delta was built.
    pub fn prepare(
        &self,
        tree: &dyn SyntaxTree,
        target: NodeId,
        delta: &SignatureDelta,
    ) -> Result<Preparation, EngineError> {
        if target != delta.target() {
            return Err(EngineError::invalid_target(
                target,
                format!("delta was built for {}", delta.target()),
            ));
        }
        match delta.validate_base(tree) {
            Ok(()) => {}
            Err(DeltaError::BaseMismatch { expected, actual }) => {
                if is_already_applied(tree, delta) {
                    tracing::info!("'{}' already has the new signature", delta.new_name());
                    return Ok(Preparation::Stop(RunOutcome::Applied(ApplySummary::unchanged())));
                }
                return Err(EngineError::StaleDelta {
                    target,
                    expected,
                    actual,
                });
            }
            Err(DeltaError::InvalidTarget { target, source }) => {
                return Err(EngineError::invalid_target(target, source.to_string()));
            }
            Err(other) => return Err(other.into()),
        }

        if !has_work(delta) {
            tracing::debug!("delta for {} changes nothing", target);
            return Ok(Preparation::Stop(RunOutcome::Applied(ApplySummary::unchanged())));
        }

        let mut usages = UsageClassifier::new(delta, self.search, self.semantics).classify(tree);
        if self.config.max_usages > 0 && usages.len() > self.config.max_usages {
            return Ok(Preparation::Stop(RunOutcome::Aborted(format!(
                "{} usages exceed the limit of {}",
                usages.len(),
                self.config.max_usages
            ))));
        }

        let report = ConflictAnalyzer::new(delta, self.search, self.semantics, &self.config)
            .analyze(tree, &mut usages);
        let mut skipped = Vec::new();
        if let Some(stop) = self.settle_conflicts(&report, &mut usages, &mut skipped) {
            return Ok(Preparation::Stop(stop));
        }

        let defaults = match self.choose_defaults(delta, &usages) {
            Ok(defaults) => defaults,
            Err(stop) => return Ok(Preparation::Stop(stop)),
        };

        Ok(Preparation::Ready(Plan {
            usages,
            report,
            skipped,
            defaults,
        }))
    }

    /// Execute a prepared plan inside one transaction
    ///
    /// # Errors
    /// Returns error if the tree refuses an edit; every edit made so far is
    /// rolled back.
    pub fn apply(
        &self,
        tree: &mut dyn SyntaxTree,
        delta: &SignatureDelta,
        plan: Plan,
    ) -> Result<RunOutcome, EngineError> {
        let Plan {
            usages,
            mut report,
            skipped,
            defaults,
        } = plan;
        let mut tx = WriteTransaction::begin(tree);
        let result =
            UsageTransformer::new(delta, self.semantics, &self.config, &defaults).apply(&mut tx, &usages);

        match result {
            Ok(summary) => {
                let edits = tx.commit();
                report.merge(summary.report);
                tracing::info!(
                    "applied {} usages with {} edits ({} skipped, {} flagged)",
                    summary.applied,
                    edits,
                    skipped.len(),
                    summary.flagged.len()
                );
                Ok(RunOutcome::Applied(ApplySummary {
                    applied_usages: summary.applied,
                    skipped,
                    flagged: summary.flagged,
                    report,
                    edits,
                }))
            }
            Err(err) => {
                tracing::error!("rolling back {} edits: {}", tx.edit_count(), err);
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Apply the execution policy; `Some` ends the run
    fn settle_conflicts(
        &self,
        report: &ConflictReport,
        usages: &mut Vec<Usage>,
        skipped: &mut Vec<NodeId>,
    ) -> Option<RunOutcome> {
        if report.is_empty() {
            return None;
        }
        if report.has_blocking() {
            return Some(RunOutcome::Conflicts(report.clone()));
        }
        match self.config.policy {
            ExecutionPolicy::Interactive => match self.hook {
                Some(hook) => match hook.confirm(report) {
                    Decision::Proceed => None,
                    Decision::Abort => Some(RunOutcome::Aborted("cancelled at conflict confirmation".into())),
                },
                None => Some(RunOutcome::Conflicts(report.clone())),
            },
            ExecutionPolicy::UnattendedConfirmAll => None,
            ExecutionPolicy::UnattendedAbortOnConflict => Some(RunOutcome::Conflicts(report.clone())),
            ExecutionPolicy::UnattendedSkipOffending => {
                if report.has_declaration_conflicts() {
                    return Some(RunOutcome::Conflicts(report.clone()));
                }
                let offending = report.usage_sites();
                usages.retain(|usage| {
                    let keep = !offending.contains(&usage.site());
                    if !keep {
                        tracing::warn!("skipping {} at {}", usage.kind_name(), usage.site());
                    }
                    keep
                });
                skipped.extend(offending);
                None
            }
        }
    }

    /// Values for new parameters the call sites cannot otherwise supply
    fn choose_defaults(&self, delta: &SignatureDelta, usages: &[Usage]) -> Result<DefaultValues, RunOutcome> {
        let mut defaults = DefaultValues::new();
        let binds_calls = usages.iter().any(|u| {
            matches!(
                u,
                Usage::Call {
                    to_change_arguments: true,
                    ..
                } | Usage::ConstructorImplicit { .. }
                    | Usage::MissingConstructor { .. }
            )
        });
        if !binds_calls {
            return Ok(defaults);
        }

        let hook = match self.config.policy {
            ExecutionPolicy::Interactive => self.hook,
            _ => None,
        };
        for p in delta.created_parameters_without_varargs() {
            let has_default = p.default_value().is_some_and(|v| !v.trim().is_empty());
            if has_default || p.use_any_single_variable() {
                continue;
            }
            let value = match hook {
                Some(hook) => match hook.choose_default_value(p.name(), p.type_text()) {
                    Some(value) => Some(value),
                    None => {
                        return Err(RunOutcome::Aborted(format!(
                            "no default value chosen for '{}'",
                            p.name()
                        )))
                    }
                },
                None if self.config.synthesize_missing_defaults => Some(zero_literal(p.type_text()).to_string()),
                None => None,
            };
            if let Some(value) = value {
                tracing::debug!("default for '{}': {}", p.name(), value);
                defaults.insert(p.name().to_string(), value);
            }
        }
        Ok(defaults)
    }
}

/// Whether the delta asks for any edit at all
fn has_work(delta: &SignatureDelta) -> bool {
    delta.is_changed()
        || delta.generate_delegate()
        || delta.is_propagation_enabled()
        || !delta.propagate_to_overriders().is_empty()
}

/// Signature the target has after the delta is applied
fn expected_signature(delta: &SignatureDelta) -> SignatureView {
    SignatureView {
        name: delta.new_name().to_string(),
        visibility: delta.new_visibility(),
        return_type: delta.new_return_type().map(str::to_string),
        parameters: delta
            .parameters()
            .iter()
            .map(|p| ParameterView {
                name: p.name().to_string(),
                type_text: p.type_text().to_string(),
            })
            .collect(),
        exceptions: delta.new_exception_types().into_iter().map(str::to_string).collect(),
    }
}

fn is_already_applied(tree: &dyn SyntaxTree, delta: &SignatureDelta) -> bool {
    delta.is_changed()
        && SignatureView::read(tree, delta.target()).is_ok_and(|current| current == expected_signature(delta))
}

fn describe(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Applied(_) => "nothing to change".to_string(),
        RunOutcome::Conflicts(report) => format!("{} conflicts", report.len()),
        RunOutcome::Aborted(reason) => reason.clone(),
    }
}
