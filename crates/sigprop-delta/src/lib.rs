//! sigprop Signature Delta
//!
//! The single source of truth for a pending signature change.
//!
//! # Core Concepts
//!
//! - [`SignatureDelta`]: Old vs. new signature with derived change flags
//! - [`ParameterDelta`] / [`ExceptionDelta`]: New list entries mapped to old positions
//! - [`DeltaBuilder`]: Validating builder seeded from the current declaration
//! - [`Propagation`]: What a propagated caller receives
//!
//! # Example
//!
//! ```rust,ignore
//! use sigprop_delta::{DeltaBuilder, ParameterDelta};
//!
//! let delta = DeltaBuilder::for_declaration(&tree, foo)?
//!     .add_parameter(ParameterDelta::added("c", "String").with_default("\"x\""))
//!     .build()?;
//! assert!(delta.is_parameter_set_or_order_changed());
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod delta;
mod error;
mod parameter;

pub use delta::{DeltaBuilder, Propagation, SignatureDelta};
pub use error::DeltaError;
pub use parameter::{ExceptionDelta, ParameterDelta};
pub use sigprop_tree::Visibility;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        DeltaBuilder, DeltaError, ExceptionDelta, ParameterDelta, Propagation, SignatureDelta,
        Visibility,
    };
}
