//! # strata
//!
//! A hierarchical state machine engine with serialized async trigger
//! dispatch.
//!
//! States and triggers are plain Rust enums identified by a discriminant
//! (the [`Variant`] trait), so states can carry payload while the engine
//! dispatches on variant identity alone. States nest: a substate inherits
//! every trigger registration of its superstates unless it shadows them,
//! and entry/exit actions propagate hierarchically, running only for the
//! states whose subtree actually becomes active or inactive.
//!
//! A hierarchy is compiled once into an immutable [`StateGraph`] and
//! shared behind an `Arc` by any number of [`Machine`] instances. Each
//! machine owns an unbounded FIFO trigger queue drained by one dedicated
//! tokio task: triggers fired concurrently from any number of callers are
//! processed strictly one at a time, each transition running to full
//! completion before the next trigger is dequeued. Actions may fire
//! triggers on their own machine; those are merely enqueued, never
//! reentrant.
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata::{Machine, Outcome, StateGraph, Variant};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Light {
//!     Red,
//!     Green,
//! }
//!
//! impl Variant for Light {
//!     type Discriminant = Light;
//!     fn discriminant(&self) -> Light {
//!         *self
//!     }
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Tick {
//!     Advance,
//! }
//!
//! impl Variant for Tick {
//!     type Discriminant = Tick;
//!     fn discriminant(&self) -> Tick {
//!         *self
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let graph = Arc::new(
//!         StateGraph::<Light, Tick, ()>::builder()
//!             .state(Light::Red, |red| {
//!                 red.on(Tick::Advance, |_, _, _| Outcome::TransitionTo(Light::Green));
//!             })
//!             .state(Light::Green, |green| {
//!                 green.on(Tick::Advance, |_, _, _| Outcome::TransitionTo(Light::Red));
//!             })
//!             .build()?,
//!     );
//!
//!     let machine = Machine::builder(graph, ()).start(Light::Red)?;
//!     machine.fire(Tick::Advance);
//!     machine.close();
//!     Ok(())
//! }
//! ```

pub use strata_core::{
    ActionScope, BuildError, DeclarationSite, GraphBuilder, Machine, MachineBuilder,
    MachineError, NodeId, Outcome, StateBuilder, StateGraph, TransitionFn, UnhandledTriggerHandler,
    Variant,
};
