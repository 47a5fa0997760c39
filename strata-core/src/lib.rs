//! # strata-core
//!
//! Hierarchical state machine engine for strata.
//!
//! This crate provides:
//! - Declarative construction of a nested state hierarchy
//! - The compiled, immutable state graph shared by machine instances
//! - The per-machine dispatch loop serializing trigger processing
//!
//! Most users should depend on the `strata` facade crate instead.

pub mod builder;
pub mod error;
pub mod graph;
pub mod machine;
pub mod scope;
pub mod variant;

pub use builder::{GraphBuilder, StateBuilder};
pub use error::{BuildError, DeclarationSite, MachineError};
pub use graph::{NodeId, StateGraph, TransitionFn};
pub use machine::{Machine, MachineBuilder, UnhandledTriggerHandler};
pub use scope::ActionScope;
pub use variant::{Outcome, Variant};
