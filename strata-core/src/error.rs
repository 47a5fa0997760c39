//! Error types for model compilation and machine runtime.

use std::fmt;
use thiserror::Error;

/// Where a state identity was first declared in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationSite<K> {
    /// Declared at the top level of the hierarchy.
    TopLevel,
    /// Declared as a substate of the named state.
    SubstateOf(K),
}

impl<K: fmt::Debug> fmt::Display for DeclarationSite<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationSite::TopLevel => write!(f, "a top-level state"),
            DeclarationSite::SubstateOf(parent) => write!(f, "a substate of {:?}", parent),
        }
    }
}

/// Errors from compiling a state hierarchy declaration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError<K: fmt::Debug> {
    /// A state identity was declared more than once anywhere in the tree.
    /// The whole build is rejected.
    #[error("state {state:?} has already been declared as {first}")]
    DuplicateState {
        state: K,
        first: DeclarationSite<K>,
    },
}

/// Errors from starting or querying a machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MachineError<K: fmt::Debug> {
    /// A state identity was encountered that is not part of the compiled
    /// hierarchy. At start time this is a configuration mistake; observed
    /// through a facade query it means delegated storage handed back a
    /// state the model never declared.
    #[error("state {state:?} is not part of the compiled hierarchy")]
    UnknownState { state: K },
}
