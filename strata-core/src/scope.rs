//! Context handed to entry and exit actions.

use crate::machine::Machine;
use crate::variant::Variant;
use std::fmt;

/// Everything an entry or exit action can see: the machine executing the
/// transition (so the action can fire follow-up triggers), the caller's
/// target object, the trigger that caused the transition, and both
/// endpoint state values.
///
/// Scopes are owned values; every action invocation receives its own
/// clone, which keeps action futures free of borrows into the machine.
pub struct ActionScope<S: Variant, T: Variant, G> {
    pub(crate) machine: Machine<S, T, G>,
    pub(crate) trigger: T,
    pub(crate) old_state: S,
    pub(crate) new_state: S,
}

impl<S: Variant, T: Variant, G> ActionScope<S, T, G> {
    /// The machine executing the transition.
    pub fn machine(&self) -> &Machine<S, T, G> {
        &self.machine
    }

    /// The caller-owned target object.
    pub fn target(&self) -> &G {
        self.machine.inner.target.as_ref()
    }

    /// The trigger that caused the transition.
    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    /// The state being left.
    pub fn old_state(&self) -> &S {
        &self.old_state
    }

    /// The state being entered.
    pub fn new_state(&self) -> &S {
        &self.new_state
    }

    /// Enqueues a trigger on the owning machine.
    ///
    /// The trigger is only enqueued: the current transition always runs
    /// to completion (exit actions, mutation, entry actions) before the
    /// loop picks it up.
    pub fn fire(&self, trigger: T)
    where
        S: Clone + fmt::Debug + Send + Sync + 'static,
        T: Clone + fmt::Debug + Send + 'static,
        G: Send + Sync + 'static,
    {
        self.machine.fire(trigger);
    }
}

impl<S, T, G> Clone for ActionScope<S, T, G>
where
    S: Variant + Clone,
    T: Variant + Clone,
{
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            trigger: self.trigger.clone(),
            old_state: self.old_state.clone(),
            new_state: self.new_state.clone(),
        }
    }
}
