//! Machine runtime: trigger queue, dispatch loop, and the public facade.
//!
//! Every machine owns exactly one dispatch loop task. Triggers arriving
//! through [`Machine::fire`] from any number of callers are enqueued on an
//! unbounded FIFO channel and processed strictly one at a time, each to
//! full completion (exit actions, state mutation, entry actions) before
//! the next is dequeued. The current-state cell is written only by the
//! loop, which is why no lock is needed around transitions themselves.

use crate::error::MachineError;
use crate::graph::{NodeId, StateGraph};
use crate::scope::ActionScope;
use crate::variant::{Outcome, Variant};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::sync::Notify;

/// Callback invoked when no node in the current state's ancestor chain
/// handles a fired trigger. Receives the target, the current state, and
/// the trigger.
pub type UnhandledTriggerHandler<S, T, G> = Box<dyn Fn(&G, &S, &T) + Send + Sync>;

/// Current-state storage: either an owned cell or a caller-supplied
/// accessor/mutator pair, so the value can live inside a caller-owned
/// object.
struct StateCell<S> {
    read: Box<dyn Fn() -> S + Send + Sync>,
    write: Box<dyn Fn(S) + Send + Sync>,
}

impl<S> StateCell<S> {
    fn owned(initial: S) -> Self
    where
        S: Clone + Send + 'static,
    {
        let cell = Arc::new(parking_lot::Mutex::new(initial));
        let reader = cell.clone();
        Self {
            read: Box::new(move || reader.lock().clone()),
            write: Box::new(move |value| *cell.lock() = value),
        }
    }

    fn get(&self) -> S {
        (self.read)()
    }

    fn set(&self, value: S) {
        (self.write)(value)
    }
}

/// Queue lifecycle shared between the facade and the dispatch loop.
struct Lifecycle {
    closed: AtomicBool,
    notify: Notify,
}

impl Lifecycle {
    fn new(closed: bool) -> Self {
        Self {
            closed: AtomicBool::new(closed),
            notify: Notify::new(),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Marks the queue closed and wakes a parked loop. Returns true on
    /// the first close only.
    fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_one();
        }
        first
    }
}

pub(crate) struct MachineInner<S: Variant, T: Variant, G> {
    id: String,
    graph: Arc<StateGraph<S, T, G>>,
    pub(crate) target: Arc<G>,
    state: StateCell<S>,
    tx: mpsc::UnboundedSender<T>,
    lifecycle: Arc<Lifecycle>,
    unhandled: UnhandledTriggerHandler<S, T, G>,
}

/// Handle to a running machine. Cheap to clone; all clones address the
/// same instance. The machine keeps processing as long as any handle is
/// alive and the queue has not been closed.
pub struct Machine<S: Variant, T: Variant, G> {
    pub(crate) inner: Arc<MachineInner<S, T, G>>,
}

impl<S: Variant, T: Variant, G> Clone for Machine<S, T, G> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Variant, T: Variant, G> fmt::Debug for Machine<S, T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.inner.id)
            .field("terminated", &self.inner.lifecycle.is_closed())
            .finish_non_exhaustive()
    }
}

/// Configures and starts a machine over a compiled graph.
///
/// Obtained from [`Machine::builder`]; finish with
/// [`start`](MachineBuilder::start) or
/// [`start_with_storage`](MachineBuilder::start_with_storage).
pub struct MachineBuilder<S: Variant, T: Variant, G> {
    graph: Arc<StateGraph<S, T, G>>,
    target: G,
    id: Option<String>,
    unhandled: Option<UnhandledTriggerHandler<S, T, G>>,
}

impl<S, T, G> Machine<S, T, G>
where
    S: Variant + Clone + fmt::Debug + Send + Sync + 'static,
    T: Variant + Clone + fmt::Debug + Send + 'static,
    G: Send + Sync + 'static,
{
    /// Begins configuration of a machine pairing `graph` with `target`.
    pub fn builder(graph: Arc<StateGraph<S, T, G>>, target: G) -> MachineBuilder<S, T, G> {
        MachineBuilder {
            graph,
            target,
            id: None,
            unhandled: None,
        }
    }

    /// Unique machine id, for diagnostics.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The caller-owned target object actions and transitions operate on.
    pub fn target(&self) -> &G {
        self.inner.target.as_ref()
    }

    /// The current state, read through the configured accessor.
    pub fn state(&self) -> S {
        self.inner.state.get()
    }

    /// True once the trigger queue is closed, whether by [`close`],
    /// by entering a terminal state, or by starting in one.
    ///
    /// [`close`]: Machine::close
    pub fn terminated(&self) -> bool {
        self.inner.lifecycle.is_closed()
    }

    /// Enqueues a trigger. Non-blocking; callable concurrently from any
    /// number of callers, including entry/exit actions of this machine.
    ///
    /// Triggers fired after the queue is closed are silently discarded;
    /// the drop is visible only as a debug-level trace event.
    pub fn fire(&self, trigger: T) {
        if self.inner.lifecycle.is_closed() {
            tracing::debug!(
                "{} - dropping trigger <{:?}> fired after close",
                self.inner.id,
                trigger
            );
            return;
        }
        // The send only fails once the loop has torn down; the policy for
        // that race is the same silent drop.
        let _ = self.inner.tx.send(trigger);
    }

    /// Closes the trigger queue. Idempotent and permanent: triggers
    /// already queued but not yet processed are discarded and never run.
    pub fn close(&self) {
        if self.inner.lifecycle.close() {
            tracing::info!("{} - closed", self.inner.id);
        }
    }

    /// Returns true if the machine is currently in the state identified
    /// by `key` or in one of its substates.
    pub fn is_in_state(&self, key: S::Discriminant) -> Result<bool, MachineError<S::Discriminant>> {
        let node = self.current_node()?;
        Ok(self.inner.graph.is_included_in(node, key))
    }

    /// Returns true if a transition for `trigger` is registered on the
    /// current state or any of its superstates.
    pub fn can_fire(&self, trigger: T::Discriminant) -> Result<bool, MachineError<S::Discriminant>> {
        let node = self.current_node()?;
        Ok(self.inner.graph.can_handle(node, trigger))
    }

    fn current_node(&self) -> Result<NodeId, MachineError<S::Discriminant>> {
        self.inner.graph.resolve(self.inner.state.get().discriminant())
    }

    /// Processes one trigger to full completion.
    async fn dispatch(&self, trigger: T) {
        let inner = &self.inner;
        let current = inner.state.get();

        let current_node = match inner.graph.resolve(current.discriminant()) {
            Ok(node) => node,
            Err(_) => {
                tracing::error!(
                    "{} - current state <{:?}> is not part of the compiled hierarchy; closing",
                    inner.id,
                    current
                );
                self.close();
                return;
            }
        };

        let Some(transition) = inner.graph.find_transition(current_node, trigger.discriminant())
        else {
            (inner.unhandled)(inner.target.as_ref(), &current, &trigger);
            return;
        };

        match transition(inner.target.as_ref(), &current, &trigger) {
            Outcome::DoNothing => {
                tracing::debug!("{} - ignoring trigger <{:?}>", inner.id, trigger);
            }
            Outcome::TransitionTo(new_state) => {
                let new_node = match inner.graph.resolve(new_state.discriminant()) {
                    Ok(node) => node,
                    Err(_) => {
                        tracing::error!(
                            "{} - transition on <{:?}> produced state <{:?}> unknown to the compiled hierarchy; closing",
                            inner.id,
                            trigger,
                            new_state
                        );
                        self.close();
                        return;
                    }
                };

                // Entering a state with no outgoing transitions shuts the
                // machine down, but only after its actions have run.
                let close_after = inner.graph.is_terminal(new_node);

                tracing::info!(
                    "{} - trigger <{:?}> causing state transition <{:?}> -> <{:?}>",
                    inner.id,
                    trigger,
                    current,
                    new_state
                );

                let scope = ActionScope {
                    machine: self.clone(),
                    trigger,
                    old_state: current,
                    new_state,
                };
                let old_key = scope.old_state.discriminant();
                let new_key = scope.new_state.discriminant();

                for id in inner.graph.exit_path(current_node, old_key, new_key) {
                    for action in &inner.graph.node(id).exit_actions {
                        action(scope.clone()).await;
                    }
                }

                inner.state.set(scope.new_state.clone());

                for id in inner.graph.entry_path(new_node, old_key, new_key) {
                    for action in &inner.graph.node(id).entry_actions {
                        action(scope.clone()).await;
                    }
                }

                if close_after {
                    self.close();
                }
            }
        }
    }
}

impl<S, T, G> MachineBuilder<S, T, G>
where
    S: Variant + Clone + fmt::Debug + Send + Sync + 'static,
    T: Variant + Clone + fmt::Debug + Send + 'static,
    G: Send + Sync + 'static,
{
    /// Overrides the generated machine id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replaces the default unhandled-trigger warning with a callback.
    pub fn on_unhandled_trigger<F>(mut self, handler: F) -> Self
    where
        F: Fn(&G, &S, &T) + Send + Sync + 'static,
    {
        self.unhandled = Some(Box::new(handler));
        self
    }

    /// Starts the machine with an owned current-state cell initialized to
    /// `initial`.
    ///
    /// Fails if the initial state's identity is absent from the graph. If
    /// the initial state is terminal the machine starts already closed
    /// and no loop is spawned. Must be called from within a tokio
    /// runtime.
    pub fn start(self, initial: S) -> Result<Machine<S, T, G>, MachineError<S::Discriminant>> {
        self.start_inner(StateCell::owned(initial))
    }

    /// Starts the machine with caller-owned state storage. The initial
    /// state is read through `read`; `write` is invoked exclusively by
    /// the dispatch loop.
    pub fn start_with_storage<R, W>(
        self,
        read: R,
        write: W,
    ) -> Result<Machine<S, T, G>, MachineError<S::Discriminant>>
    where
        R: Fn() -> S + Send + Sync + 'static,
        W: Fn(S) + Send + Sync + 'static,
    {
        self.start_inner(StateCell {
            read: Box::new(read),
            write: Box::new(write),
        })
    }

    fn start_inner(
        self,
        state: StateCell<S>,
    ) -> Result<Machine<S, T, G>, MachineError<S::Discriminant>> {
        let initial = state.get();
        let initial_node = self.graph.resolve(initial.discriminant())?;
        let terminal = self.graph.is_terminal(initial_node);

        let id = self
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let unhandled = self
            .unhandled
            .unwrap_or_else(|| default_unhandled_handler(id.clone()));

        let (tx, rx) = mpsc::unbounded_channel();
        let lifecycle = Arc::new(Lifecycle::new(terminal));

        let inner = Arc::new(MachineInner {
            id,
            graph: self.graph,
            target: Arc::new(self.target),
            state,
            tx,
            lifecycle: lifecycle.clone(),
            unhandled,
        });
        let machine = Machine {
            inner: inner.clone(),
        };

        if terminal {
            tracing::info!(
                "{} - started in terminal state <{:?}>",
                machine.inner.id,
                initial
            );
        } else {
            tokio::spawn(run_loop(Arc::downgrade(&inner), lifecycle, rx));
        }

        Ok(machine)
    }
}

fn default_unhandled_handler<S, T, G>(id: String) -> UnhandledTriggerHandler<S, T, G>
where
    S: fmt::Debug,
    T: fmt::Debug,
{
    Box::new(move |_, state, trigger| {
        tracing::warn!(
            "{} - no valid transitions are configured from state <{:?}> with trigger <{:?}>; ignore this trigger to hide this warning",
            id,
            state,
            trigger
        );
    })
}

/// The dedicated dispatch loop: drains the queue one trigger at a time
/// until the queue closes or every handle to the machine is gone.
///
/// Only a weak reference is held while parked, so dropping the last
/// [`Machine`] handle tears the loop down through channel closure instead
/// of leaking a parked task.
async fn run_loop<S, T, G>(
    inner: Weak<MachineInner<S, T, G>>,
    lifecycle: Arc<Lifecycle>,
    mut rx: mpsc::UnboundedReceiver<T>,
) where
    S: Variant + Clone + fmt::Debug + Send + Sync + 'static,
    T: Variant + Clone + fmt::Debug + Send + 'static,
    G: Send + Sync + 'static,
{
    loop {
        let trigger = tokio::select! {
            _ = lifecycle.notify.notified() => break,
            received = rx.recv() => match received {
                Some(trigger) => trigger,
                None => break,
            },
        };

        // A close that raced ahead of this trigger discards it, along
        // with everything still queued behind it.
        if lifecycle.is_closed() {
            break;
        }

        let Some(strong) = inner.upgrade() else { break };
        let machine = Machine { inner: strong };
        machine.dispatch(trigger).await;

        if lifecycle.is_closed() {
            break;
        }
    }

    if let Some(strong) = inner.upgrade() {
        tracing::info!("{} - terminated", strong.id);
    }
}
