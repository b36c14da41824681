//! sigprop Core Engine
//!
//! Propagates a method or constructor signature change through a program:
//! every call site, overrider, propagated caller and related declaration is
//! rewritten inside one transaction, or nothing is.
//!
//! # Core Concepts
//!
//! - [`Engine`]: Prepare (classify, analyze, settle policy) then apply
//! - [`UsageClassifier`] / [`Usage`]: Typed view of every affected site
//! - [`ConflictAnalyzer`] / [`ConflictReport`]: What could go wrong, found up front
//! - [`UsageTransformer`]: Fixed-order application of usages and the declaration change
//! - [`ArgumentBinder`] / [`ExceptionReconciler`]: Per-call-site rewriting
//! - [`SearchProvider`] / [`SemanticModel`] / [`PolicyHook`]: Host services
//!
//! # Example
//!
//! ```rust,ignore
//! use sigprop_core::prelude::*;
//!
//! let delta = DeltaBuilder::for_declaration(&tree, foo)?
//!     .parameters(vec![ParameterDelta::existing(1, "b", "int"), ParameterDelta::existing(0, "a", "int")])
//!     .build()?;
//! let outcome = Engine::new(EngineConfig::default(), &search, &semantics).run(&mut tree, foo, &delta)?;
//! assert!(outcome.is_applied());
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Core modules
mod binder;
mod classify;
mod config;
mod conflict;
mod contract;
mod declaration;
mod engine;
mod error;
mod exceptions;
mod host;
mod outcome;
mod scope;
mod transform;
mod usage;

// Re-exports
pub use binder::{zero_literal, ArgumentBinder, BindMode, BindNote, DefaultValues};
pub use classify::UsageClassifier;
pub use config::{EngineConfig, ExecutionPolicy};
pub use conflict::{Conflict, ConflictAnalyzer, ConflictKind, ConflictReport, ConflictScope, Severity};
pub use declaration::{insert_super_call, DeclarationRewriter};
pub use engine::{Engine, Plan, Preparation};
pub use error::{ConfigError, EngineError};
pub use exceptions::{extend_throws_list, ExceptionFix, ExceptionReconciler};
pub use host::{Decision, PolicyHook, RawUsage, SearchProvider, SemanticModel};
pub use outcome::{ApplySummary, FlaggedSite, RunOutcome};
pub use transform::{TransformSummary, UsageTransformer};
pub use usage::Usage;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ConflictKind, ConflictReport, Decision, Engine, EngineConfig, EngineError, ExecutionPolicy,
        PolicyHook, RawUsage, RunOutcome, SearchProvider, SemanticModel, Usage,
    };
    pub use sigprop_delta::{DeltaBuilder, ExceptionDelta, ParameterDelta, Propagation, SignatureDelta};
    pub use sigprop_tree::{NodeId, NodeKind, SyntaxTree};
}
