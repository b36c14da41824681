//! Testing utilities for the sigprop workspace
//!
//! Shared fixtures: a source-snippet [`ProgramBuilder`], a name-resolving
//! [`StaticModel`] implementing the host services, a [`ScriptedHook`] and
//! one-time logging setup.

#![allow(missing_docs)]

mod builder;
mod hook;
mod logging;
mod model;
mod parse;

pub use builder::ProgramBuilder;
pub use hook::ScriptedHook;
pub use logging::init_test_logging;
pub use model::StaticModel;
