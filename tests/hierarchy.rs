//! End-to-end tests for nested substates: inherited transitions,
//! hierarchical entry/exit propagation, and self-transitions that only
//! change payload.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use strata::{Machine, Outcome, StateGraph, Variant};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

async fn settled(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("machine did not settle in time");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Region {
    A,
    B,
    C,
    D,
    E,
    T,
}

impl Variant for Region {
    type Discriminant = Region;

    fn discriminant(&self) -> Region {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Hop {
    ToA,
    ToB,
    ToC,
    ToD,
    ToE,
    ToT,
    Ping,
}

impl Variant for Hop {
    type Discriminant = Hop;

    fn discriminant(&self) -> Hop {
        *self
    }
}

/// A
/// ├── B
/// │   └── C
/// └── E
/// D and T top-level; T is terminal.
///
/// Every `ToX` hop is registered on A and inherited everywhere below it;
/// the substates carry a local `Ping` no-op so only T is terminal.
fn region_graph() -> Arc<StateGraph<Region, Hop, Recorder>> {
    fn trace(builder: &mut strata::StateBuilder<Region, Hop, Recorder>, name: &'static str) {
        builder.on_entry(move |scope| async move {
            scope.target().push(format!("{}-entry", name));
        });
        builder.on_exit(move |scope| async move {
            scope.target().push(format!("{}-exit", name));
        });
    }

    Arc::new(
        StateGraph::builder()
            .state(Region::A, |a| {
                trace(a, "a");
                a.on(Hop::ToA, |_, _, _| Outcome::TransitionTo(Region::A));
                a.on(Hop::ToB, |_, _, _| Outcome::TransitionTo(Region::B));
                a.on(Hop::ToC, |_, _, _| Outcome::TransitionTo(Region::C));
                a.on(Hop::ToD, |_, _, _| Outcome::TransitionTo(Region::D));
                a.on(Hop::ToE, |_, _, _| Outcome::TransitionTo(Region::E));
                a.on(Hop::ToT, |_, _, _| Outcome::TransitionTo(Region::T));
                a.state(Region::B, |b| {
                    trace(b, "b");
                    b.on(Hop::Ping, |_, _, _| Outcome::DoNothing);
                    b.state(Region::C, |c| {
                        trace(c, "c");
                        c.on(Hop::Ping, |_, _, _| Outcome::DoNothing);
                    });
                });
                a.state(Region::E, |e| {
                    trace(e, "e");
                    e.on(Hop::Ping, |_, _, _| Outcome::DoNothing);
                });
            })
            .state(Region::D, |d| {
                trace(d, "d");
                d.on(Hop::ToA, |_, _, _| Outcome::TransitionTo(Region::A));
            })
            .state(Region::T, |t| {
                trace(t, "t");
            })
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn substates_inherit_superstate_transitions() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::C)
        .unwrap();

    // ToD is registered on A, two levels above C.
    assert!(machine.can_fire(Hop::ToD).unwrap());
    assert!(machine.can_fire(Hop::Ping).unwrap());

    machine.fire(Hop::ToD);
    settled(|| machine.state() == Region::D).await;

    // D is top-level: it inherits nothing from A.
    assert!(!machine.can_fire(Hop::ToD).unwrap());
    assert!(machine.can_fire(Hop::ToA).unwrap());
    machine.close();
}

#[tokio::test]
async fn is_in_state_walks_the_ancestor_chain() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::C)
        .unwrap();

    assert!(machine.is_in_state(Region::C).unwrap());
    assert!(machine.is_in_state(Region::B).unwrap());
    assert!(machine.is_in_state(Region::A).unwrap());
    assert!(!machine.is_in_state(Region::D).unwrap());
    assert!(!machine.is_in_state(Region::E).unwrap());
    machine.close();
}

#[tokio::test]
async fn sibling_transition_skips_the_shared_ancestor() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::B)
        .unwrap();

    machine.fire(Hop::ToE);
    settled(|| machine.state() == Region::E).await;

    // A stays active: neither its exit nor its entry actions run.
    assert_eq!(machine.target().events(), vec!["b-exit", "e-entry"]);
    machine.close();
}

#[tokio::test]
async fn leaving_the_tree_exits_bottom_up_and_enters_top_down() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::C)
        .unwrap();

    machine.fire(Hop::ToD);
    settled(|| machine.state() == Region::D).await;

    assert_eq!(
        machine.target().events(),
        vec!["c-exit", "b-exit", "a-exit", "d-entry"]
    );

    machine.fire(Hop::ToA);
    settled(|| machine.state() == Region::A).await;

    assert_eq!(
        machine.target().events(),
        vec!["c-exit", "b-exit", "a-exit", "d-entry", "d-exit", "a-entry"]
    );
    machine.close();
}

#[tokio::test]
async fn entering_a_descendant_does_not_rerun_the_ancestor() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::A)
        .unwrap();

    machine.fire(Hop::ToC);
    settled(|| machine.state() == Region::C).await;

    // A was already active: only B and C enter, ancestors first.
    assert_eq!(machine.target().events(), vec!["b-entry", "c-entry"]);
    machine.close();
}

#[tokio::test]
async fn leaving_for_an_ancestor_does_not_exit_the_ancestor() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::C)
        .unwrap();

    machine.fire(Hop::ToA);
    settled(|| machine.state() == Region::A).await;

    // A remains active throughout: no a-exit, no a-entry.
    assert_eq!(machine.target().events(), vec!["c-exit", "b-exit"]);
    machine.close();
}

#[tokio::test]
async fn cousin_transition_runs_each_action_at_most_once() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::C)
        .unwrap();

    // C -> E: lowest common ancestor is A, which stays untouched.
    machine.fire(Hop::ToE);
    settled(|| machine.state() == Region::E).await;

    let events = machine.target().events();
    assert_eq!(events, vec!["c-exit", "b-exit", "e-entry"]);
    for event in &events {
        assert_eq!(events.iter().filter(|e| e == &event).count(), 1);
    }
    machine.close();
}

#[tokio::test]
async fn do_nothing_runs_no_actions() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::B)
        .unwrap();

    machine.fire(Hop::Ping);
    machine.fire(Hop::ToE);
    settled(|| machine.state() == Region::E).await;

    // Ping was processed first and left no trace.
    assert_eq!(machine.target().events(), vec!["b-exit", "e-entry"]);
    machine.close();
}

#[tokio::test]
async fn entering_a_terminal_state_runs_its_actions_first() {
    let machine = Machine::builder(region_graph(), Recorder::default())
        .start(Region::A)
        .unwrap();

    machine.fire(Hop::ToT);
    settled(|| machine.terminated()).await;

    assert_eq!(machine.state(), Region::T);
    assert_eq!(machine.target().events(), vec!["a-exit", "t-entry"]);
}

// Payload-carrying states: a self-transition keeps the discriminant and
// swaps the payload.

#[derive(Debug, Clone, PartialEq)]
enum Work {
    Idle,
    Counting { n: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WorkKind {
    Idle,
    Busy,
    Counting,
}

impl Variant for Work {
    type Discriminant = WorkKind;

    fn discriminant(&self) -> WorkKind {
        match self {
            Work::Idle => WorkKind::Idle,
            Work::Counting { .. } => WorkKind::Counting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Step {
    Start,
    Bump,
}

impl Variant for Step {
    type Discriminant = Step;

    fn discriminant(&self) -> Step {
        *self
    }
}

/// Idle top-level; Busy is an abstract superstate grouping Counting.
fn work_graph() -> Arc<StateGraph<Work, Step, Recorder>> {
    Arc::new(
        StateGraph::builder()
            .state(WorkKind::Idle, |idle| {
                idle.on(Step::Start, |_: &Recorder, _, _| {
                    Outcome::TransitionTo(Work::Counting { n: 0 })
                });
            })
            .state(WorkKind::Busy, |busy| {
                busy.on_entry(|scope| async move {
                    scope.target().push("busy-entry");
                });
                busy.on_exit(|scope| async move {
                    scope.target().push("busy-exit");
                });
                busy.on(Step::Start, |_, _, _| Outcome::DoNothing);
                busy.state(WorkKind::Counting, |counting| {
                    counting.on(Step::Bump, |_, state, _| match state {
                        Work::Counting { n } => Outcome::TransitionTo(Work::Counting { n: n + 1 }),
                        _ => Outcome::DoNothing,
                    });
                    counting.on_entry(|scope| async move {
                        if let Work::Counting { n } = scope.new_state() {
                            scope.target().push(format!("count-entry:{}", n));
                        }
                    });
                    counting.on_exit(|scope| async move {
                        if let Work::Counting { n } = scope.old_state() {
                            scope.target().push(format!("count-exit:{}", n));
                        }
                    });
                });
            })
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn self_transition_runs_only_the_nodes_own_actions() {
    let machine = Machine::builder(work_graph(), Recorder::default())
        .start(Work::Idle)
        .unwrap();

    machine.fire(Step::Start);
    settled(|| machine.state() == Work::Counting { n: 0 }).await;

    // Entering Counting from outside enters Busy first.
    assert_eq!(
        machine.target().events(),
        vec!["busy-entry", "count-entry:0"]
    );

    machine.fire(Step::Bump);
    machine.fire(Step::Bump);
    settled(|| machine.state() == Work::Counting { n: 2 }).await;

    // Each bump is a self-transition: Counting's own exit then entry,
    // and never Busy's.
    assert_eq!(
        machine.target().events(),
        vec![
            "busy-entry",
            "count-entry:0",
            "count-exit:0",
            "count-entry:1",
            "count-exit:1",
            "count-entry:2",
        ]
    );
    assert!(machine.is_in_state(WorkKind::Busy).unwrap());
    machine.close();
}
