//! Declarative construction of the state hierarchy.
//!
//! A hierarchy is declared as a nested set of states, each carrying its
//! trigger registrations, ordered entry/exit actions, and substate
//! declarations:
//!
//! ```
//! use strata_core::{Outcome, StateGraph, Variant};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Door {
//!     Open,
//!     Closed,
//!     Locked,
//! }
//!
//! impl Variant for Door {
//!     type Discriminant = Door;
//!     fn discriminant(&self) -> Door {
//!         *self
//!     }
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Key {
//!     Turn,
//!     Push,
//! }
//!
//! impl Variant for Key {
//!     type Discriminant = Key;
//!     fn discriminant(&self) -> Key {
//!         *self
//!     }
//! }
//!
//! let graph = StateGraph::<Door, Key, ()>::builder()
//!     .state(Door::Closed, |closed| {
//!         closed.on(Key::Push, |_, _, _| Outcome::TransitionTo(Door::Open));
//!         closed.on(Key::Turn, |_, _, _| Outcome::TransitionTo(Door::Locked));
//!     })
//!     .state(Door::Open, |open| {
//!         open.on(Key::Push, |_, _, _| Outcome::TransitionTo(Door::Closed));
//!     })
//!     .state(Door::Locked, |_| {})
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.len(), 3);
//! ```

use crate::error::{BuildError, DeclarationSite};
use crate::graph::{ActionFn, NodeId, StateGraph, StateNode, TransitionFn};
use crate::scope::ActionScope;
use crate::variant::{Outcome, Variant};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;

/// One declared state: trigger registrations, actions, and nested
/// substate declarations of the same shape.
pub struct StateBuilder<S: Variant, T: Variant, G> {
    key: S::Discriminant,
    transitions: HashMap<T::Discriminant, TransitionFn<S, T, G>>,
    entry_actions: Vec<ActionFn<S, T, G>>,
    exit_actions: Vec<ActionFn<S, T, G>>,
    children: Vec<StateBuilder<S, T, G>>,
}

impl<S: Variant, T: Variant, G> StateBuilder<S, T, G> {
    fn new(key: S::Discriminant) -> Self {
        Self {
            key,
            transitions: HashMap::new(),
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Registers the transition function evaluated when `trigger` arrives
    /// while this state (or a substate that does not shadow the
    /// registration) is active. Registering the same trigger again
    /// replaces the earlier function.
    pub fn on<F>(&mut self, trigger: T::Discriminant, transition: F) -> &mut Self
    where
        F: Fn(&G, &S, &T) -> Outcome<S> + Send + Sync + 'static,
    {
        self.transitions.insert(trigger, Box::new(transition));
        self
    }

    /// Appends an entry action. Actions run in registration order.
    pub fn on_entry<F, Fut>(&mut self, action: F) -> &mut Self
    where
        F: Fn(ActionScope<S, T, G>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.entry_actions
            .push(Box::new(move |scope| -> BoxFuture<'static, ()> {
                Box::pin(action(scope))
            }));
        self
    }

    /// Appends an exit action. Actions run in registration order.
    pub fn on_exit<F, Fut>(&mut self, action: F) -> &mut Self
    where
        F: Fn(ActionScope<S, T, G>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.exit_actions
            .push(Box::new(move |scope| -> BoxFuture<'static, ()> {
                Box::pin(action(scope))
            }));
        self
    }

    /// Declares a substate nested under this state. Substates inherit
    /// this state's trigger registrations unless they shadow them.
    pub fn state(
        &mut self,
        key: S::Discriminant,
        configure: impl FnOnce(&mut StateBuilder<S, T, G>),
    ) -> &mut Self {
        let mut child = StateBuilder::new(key);
        configure(&mut child);
        self.children.push(child);
        self
    }
}

/// Builder for a [`StateGraph`]: declare top-level states, nest substates,
/// then [`build`](GraphBuilder::build).
pub struct GraphBuilder<S: Variant, T: Variant, G> {
    roots: Vec<StateBuilder<S, T, G>>,
}

impl<S: Variant, T: Variant, G> GraphBuilder<S, T, G> {
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    /// Declares a top-level state.
    pub fn state(
        mut self,
        key: S::Discriminant,
        configure: impl FnOnce(&mut StateBuilder<S, T, G>),
    ) -> Self {
        let mut state = StateBuilder::new(key);
        configure(&mut state);
        self.roots.push(state);
        self
    }

    /// Compiles the declarations into an immutable graph.
    ///
    /// Fails fast if any state identity is declared more than once
    /// anywhere in the tree; the error names the identity and where it
    /// was first declared. A state whose own transition table ends up
    /// empty is compiled as terminal.
    pub fn build(self) -> Result<StateGraph<S, T, G>, BuildError<S::Discriminant>> {
        let mut graph = StateGraph {
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        for root in self.roots {
            Self::compile(root, None, &mut graph)?;
        }
        Ok(graph)
    }

    fn compile(
        decl: StateBuilder<S, T, G>,
        parent: Option<NodeId>,
        graph: &mut StateGraph<S, T, G>,
    ) -> Result<(), BuildError<S::Discriminant>> {
        let StateBuilder {
            key,
            transitions,
            entry_actions,
            exit_actions,
            children,
        } = decl;

        if let Some(&existing) = graph.index.get(&key) {
            let first = match graph.nodes[existing.0].parent {
                None => DeclarationSite::TopLevel,
                Some(parent) => DeclarationSite::SubstateOf(graph.nodes[parent.0].key),
            };
            return Err(BuildError::DuplicateState { state: key, first });
        }

        let id = NodeId(graph.nodes.len());
        graph.nodes.push(StateNode {
            key,
            parent,
            children: Vec::new(),
            terminal: transitions.is_empty(),
            transitions,
            entry_actions,
            exit_actions,
        });
        graph.index.insert(key, id);
        if let Some(parent) = parent {
            graph.nodes[parent.0].children.push(id);
        }

        for child in children {
            Self::compile(child, Some(id), graph)?;
        }
        Ok(())
    }
}

impl<S: Variant, T: Variant, G> Default for GraphBuilder<S, T, G> {
    fn default() -> Self {
        Self::new()
    }
}
