//! The compiled state hierarchy graph.
//!
//! The graph is an arena of nodes with non-owning parent links, indexed
//! by state discriminant. It is built once by
//! [`GraphBuilder`](crate::builder::GraphBuilder), is immutable from then
//! on, and is shared behind an `Arc` by any number of machines.

use crate::error::MachineError;
use crate::scope::ActionScope;
use crate::variant::{Outcome, Variant};
use futures::future::BoxFuture;
use std::collections::HashMap;

/// A transition function: a pure mapping from the current state and an
/// incoming trigger to an [`Outcome`]. The machine's target is passed
/// through so the decision can read caller-domain data.
pub type TransitionFn<S, T, G> = Box<dyn Fn(&G, &S, &T) -> Outcome<S> + Send + Sync>;

/// A type-erased entry or exit action.
pub(crate) type ActionFn<S, T, G> =
    Box<dyn Fn(ActionScope<S, T, G>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Index of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// One compiled state, including its place in the hierarchy.
pub(crate) struct StateNode<S: Variant, T: Variant, G> {
    pub(crate) key: S::Discriminant,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Fixed at compile time: true iff the local transition table is
    /// empty. Never recomputed.
    pub(crate) terminal: bool,
    pub(crate) transitions: HashMap<T::Discriminant, TransitionFn<S, T, G>>,
    pub(crate) entry_actions: Vec<ActionFn<S, T, G>>,
    pub(crate) exit_actions: Vec<ActionFn<S, T, G>>,
}

/// The immutable state hierarchy shared by all machines over one model.
pub struct StateGraph<S: Variant, T: Variant, G> {
    pub(crate) nodes: Vec<StateNode<S, T, G>>,
    pub(crate) index: HashMap<S::Discriminant, NodeId>,
}

impl<S: Variant, T: Variant, G> StateGraph<S, T, G> {
    /// Returns a builder for declaring a hierarchy.
    pub fn builder() -> crate::builder::GraphBuilder<S, T, G> {
        crate::builder::GraphBuilder::new()
    }

    /// Resolves a state discriminant to its node.
    pub fn resolve(&self, key: S::Discriminant) -> Result<NodeId, MachineError<S::Discriminant>> {
        self.index
            .get(&key)
            .copied()
            .ok_or(MachineError::UnknownState { state: key })
    }

    /// Returns true if the discriminant names a state in the hierarchy.
    pub fn contains(&self, key: S::Discriminant) -> bool {
        self.index.contains_key(&key)
    }

    /// Number of states in the hierarchy, substates included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no states were declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if the node's own transition table is empty.
    pub fn is_terminal(&self, id: NodeId) -> bool {
        self.node(id).terminal
    }

    pub(crate) fn node(&self, id: NodeId) -> &StateNode<S, T, G> {
        &self.nodes[id.0]
    }

    /// Finds the transition registered for `trigger` on `id` or on the
    /// nearest ancestor that registers it. A local registration shadows
    /// the superstate's.
    pub(crate) fn find_transition(
        &self,
        id: NodeId,
        trigger: T::Discriminant,
    ) -> Option<&TransitionFn<S, T, G>> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if let Some(transition) = node.transitions.get(&trigger) {
                return Some(transition);
            }
            current = node.parent;
        }
        None
    }

    /// Returns true if `id` or any of its ancestors handles `trigger`.
    pub fn can_handle(&self, id: NodeId, trigger: T::Discriminant) -> bool {
        self.find_transition(id, trigger).is_some()
    }

    /// Returns true if `id` is the state identified by `key` or a
    /// substate of it.
    pub fn is_included_in(&self, id: NodeId, key: S::Discriminant) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.key == key {
                return true;
            }
            current = node.parent;
        }
        false
    }

    /// Returns true if `key` identifies `id` itself or any node in its
    /// subtree.
    pub(crate) fn includes(&self, id: NodeId, key: S::Discriminant) -> bool {
        let node = self.node(id);
        node.key == key || node.children.iter().any(|&child| self.includes(child, key))
    }

    /// Nodes whose exit actions run when leaving `from`, bottom-up.
    ///
    /// A self-transition exits only the node itself. Otherwise the walk
    /// climbs from `from` and stops at the first node that still contains
    /// the new state in its subtree: that node and its ancestors remain
    /// active and must not exit.
    pub(crate) fn exit_path(
        &self,
        from: NodeId,
        old: S::Discriminant,
        new: S::Discriminant,
    ) -> Vec<NodeId> {
        if old == new {
            return vec![from];
        }
        let mut path = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            if self.includes(id, new) {
                break;
            }
            path.push(id);
            current = self.node(id).parent;
        }
        path
    }

    /// Nodes whose entry actions run when entering `to`, top-down.
    ///
    /// A self-transition re-enters only the node itself. Otherwise nodes
    /// whose subtree already contained the old state were active the whole
    /// time and are skipped; the rest enter ancestors-first.
    pub(crate) fn entry_path(
        &self,
        to: NodeId,
        old: S::Discriminant,
        new: S::Discriminant,
    ) -> Vec<NodeId> {
        if old == new {
            return vec![to];
        }
        let mut path = Vec::new();
        let mut current = Some(to);
        while let Some(id) = current {
            if self.includes(id, old) {
                break;
            }
            path.push(id);
            current = self.node(id).parent;
        }
        path.reverse();
        path
    }
}
