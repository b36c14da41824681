//! sigprop Structural Tree
//!
//! Host-independent view of a mutable program tree.
//!
//! # Core Concepts
//!
//! - [`SyntaxTree`]: The node operations the engine performs on a host tree
//! - [`MemoryTree`]: Arena-backed implementation with a Java-like renderer
//! - [`WriteTransaction`]: Journaled edits rolled back unless committed
//! - [`Fingerprint`]: Blake3 digest of a declaration signature
//! - [`DeclarationShape`] / [`CallShape`]: Typed views over node layouts
//!
//! # Example
//!
//! ```rust,ignore
//! use sigprop_tree::{MemoryTree, SyntaxTree, WriteTransaction};
//!
//! let mut tree = MemoryTree::new();
//! let mut tx = WriteTransaction::begin(&mut tree);
//! tx.set_text(name, "renamed")?;
//! tx.commit();
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Core modules
mod error;
mod fingerprint;
mod memory;
mod node;
mod render;
mod shape;
mod transaction;
mod tree;
mod visibility;

/// Detached node construction helpers
pub mod factory;

// Re-exports
pub use error::TreeError;
pub use fingerprint::Fingerprint;
pub use memory::MemoryTree;
pub use node::{NodeId, NodeKind};
pub use render::{render, render_header};
pub use shape::{
    constructors_of, containing_class, enclosing_declaration, enclosing_statement,
    top_level_class, variable_initializer, variable_parts, CallShape, DeclarationShape,
    ParameterView, SignatureView,
};
pub use transaction::WriteTransaction;
pub use tree::SyntaxTree;
pub use visibility::Visibility;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CallShape, DeclarationShape, MemoryTree, NodeId, NodeKind, SyntaxTree, TreeError,
        Visibility, WriteTransaction,
    };
}
