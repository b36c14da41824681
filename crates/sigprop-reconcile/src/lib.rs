//! sigprop Sequence Reconciliation
//!
//! Minimal-edit patching of ordered child sequences (parameter lists,
//! argument lists, throws lists, documentation tags).
//!
//! # Core Concepts
//!
//! - [`SequenceReconciler`]: Edits a parent until its children equal a desired list
//! - [`ChildrenAccessor`]: Strategy selecting which children take part
//! - [`ReconcileStats`]: Edit counts, used to check minimality and idempotence
//!
//! # Example
//!
//! ```rust,ignore
//! use sigprop_reconcile::synchronize_list;
//!
//! // foo(1, 2) -> foo(2, 1)
//! synchronize_list(&mut tree, args, &[Some(two), Some(one)], &[])?;
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod accessor;
mod error;
mod reconciler;

pub use accessor::{ChildrenAccessor, ChildrenOfKind, ListElements};
pub use error::ReconcileError;
pub use reconciler::{synchronize_list, ReconcileStats, SequenceReconciler};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
