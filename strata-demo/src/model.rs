//! Call states, triggers, and the compiled call model.

use crate::handset::Handset;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use strata_core::{Outcome, StateGraph, Variant};

/// Where a call is. Off-hook states carry the time the handset was
/// lifted; once a number is known it travels with the state.
#[derive(Debug, Clone, PartialEq)]
pub enum CallState {
    OnHook,
    AwaitingNumber {
        off_hook_at: DateTime<Utc>,
    },
    Validating {
        off_hook_at: DateTime<Utc>,
        number: String,
    },
    Connecting {
        off_hook_at: DateTime<Utc>,
        number: String,
    },
    Connected {
        off_hook_at: DateTime<Utc>,
        number: String,
    },
    Failed {
        off_hook_at: DateTime<Utc>,
        number: String,
    },
}

/// State identity. `OffHook` is an abstract superstate grouping every
/// lifted-handset state; no call is ever in it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStateKind {
    OnHook,
    OffHook,
    AwaitingNumber,
    Validating,
    Connecting,
    Connected,
    Failed,
}

impl Variant for CallState {
    type Discriminant = CallStateKind;

    fn discriminant(&self) -> CallStateKind {
        match self {
            CallState::OnHook => CallStateKind::OnHook,
            CallState::AwaitingNumber { .. } => CallStateKind::AwaitingNumber,
            CallState::Validating { .. } => CallStateKind::Validating,
            CallState::Connecting { .. } => CallStateKind::Connecting,
            CallState::Connected { .. } => CallStateKind::Connected,
            CallState::Failed { .. } => CallStateKind::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallTrigger {
    PickedUp,
    NumberDialled { number: String },
    ValidationSucceeded,
    ValidationFailed,
    ConnectionEstablished,
    ConnectionFailed,
    HungUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTriggerKind {
    PickedUp,
    NumberDialled,
    ValidationSucceeded,
    ValidationFailed,
    ConnectionEstablished,
    ConnectionFailed,
    HungUp,
}

impl Variant for CallTrigger {
    type Discriminant = CallTriggerKind;

    fn discriminant(&self) -> CallTriggerKind {
        match self {
            CallTrigger::PickedUp => CallTriggerKind::PickedUp,
            CallTrigger::NumberDialled { .. } => CallTriggerKind::NumberDialled,
            CallTrigger::ValidationSucceeded => CallTriggerKind::ValidationSucceeded,
            CallTrigger::ValidationFailed => CallTriggerKind::ValidationFailed,
            CallTrigger::ConnectionEstablished => CallTriggerKind::ConnectionEstablished,
            CallTrigger::ConnectionFailed => CallTriggerKind::ConnectionFailed,
            CallTrigger::HungUp => CallTriggerKind::HungUp,
        }
    }
}

/// Compiles the call model.
///
/// On-hook swallows async results that arrive after a hang-up: a
/// validation or connection outcome for a call nobody is holding is
/// declared a no-op rather than an unhandled trigger.
pub fn call_model() -> Arc<StateGraph<CallState, CallTrigger, Handset>> {
    let graph = StateGraph::<CallState, CallTrigger, Handset>::builder()
        .state(CallStateKind::OnHook, |on_hook| {
            on_hook.on(CallTriggerKind::PickedUp, |_, _, _| {
                Outcome::TransitionTo(CallState::AwaitingNumber {
                    off_hook_at: Utc::now(),
                })
            });

            on_hook.on(CallTriggerKind::ValidationSucceeded, |_, _, _| Outcome::DoNothing);
            on_hook.on(CallTriggerKind::ValidationFailed, |_, _, _| Outcome::DoNothing);
            on_hook.on(CallTriggerKind::ConnectionEstablished, |_, _, _| Outcome::DoNothing);
            on_hook.on(CallTriggerKind::ConnectionFailed, |_, _, _| Outcome::DoNothing);
        })
        .state(CallStateKind::OffHook, |off_hook| {
            off_hook.on_entry(|scope| async move {
                scope.target().turn_on_light();
            });
            off_hook.on_exit(|scope| async move {
                scope.target().turn_off_light();
            });

            off_hook.state(CallStateKind::AwaitingNumber, |awaiting| {
                awaiting.on(CallTriggerKind::NumberDialled, |_, state, trigger| {
                    match (state, trigger) {
                        (
                            CallState::AwaitingNumber { off_hook_at },
                            CallTrigger::NumberDialled { number },
                        ) => Outcome::TransitionTo(CallState::Validating {
                            off_hook_at: *off_hook_at,
                            number: number.clone(),
                        }),
                        _ => Outcome::DoNothing,
                    }
                });
                awaiting.on(CallTriggerKind::HungUp, |_, _, _| {
                    Outcome::TransitionTo(CallState::OnHook)
                });
            });

            off_hook.state(CallStateKind::Validating, |validating| {
                validating.on_entry(|scope| async move {
                    let number = match scope.new_state() {
                        CallState::Validating { number, .. } => number.clone(),
                        _ => return,
                    };
                    if scope.target().validate(&number).await {
                        scope.fire(CallTrigger::ValidationSucceeded);
                    } else {
                        scope.fire(CallTrigger::ValidationFailed);
                    }
                });

                validating.on(CallTriggerKind::ValidationSucceeded, |_, state, _| {
                    match state {
                        CallState::Validating { off_hook_at, number } => {
                            Outcome::TransitionTo(CallState::Connecting {
                                off_hook_at: *off_hook_at,
                                number: number.clone(),
                            })
                        }
                        _ => Outcome::DoNothing,
                    }
                });
                validating.on(CallTriggerKind::ValidationFailed, |_, state, _| match state {
                    CallState::Validating { off_hook_at, number } => {
                        Outcome::TransitionTo(CallState::Failed {
                            off_hook_at: *off_hook_at,
                            number: number.clone(),
                        })
                    }
                    _ => Outcome::DoNothing,
                });
                validating.on(CallTriggerKind::HungUp, |_, _, _| {
                    Outcome::TransitionTo(CallState::OnHook)
                });
            });

            off_hook.state(CallStateKind::Connecting, |connecting| {
                connecting.on_entry(|scope| async move {
                    let number = match scope.new_state() {
                        CallState::Connecting { number, .. } => number.clone(),
                        _ => return,
                    };
                    if scope.target().connect(&number).await {
                        scope.fire(CallTrigger::ConnectionEstablished);
                    } else {
                        scope.fire(CallTrigger::ConnectionFailed);
                    }
                });

                connecting.on(CallTriggerKind::ConnectionEstablished, |_, state, _| {
                    match state {
                        CallState::Connecting { off_hook_at, number } => {
                            Outcome::TransitionTo(CallState::Connected {
                                off_hook_at: *off_hook_at,
                                number: number.clone(),
                            })
                        }
                        _ => Outcome::DoNothing,
                    }
                });
                connecting.on(CallTriggerKind::ConnectionFailed, |_, state, _| match state {
                    CallState::Connecting { off_hook_at, number } => {
                        Outcome::TransitionTo(CallState::Failed {
                            off_hook_at: *off_hook_at,
                            number: number.clone(),
                        })
                    }
                    _ => Outcome::DoNothing,
                });
                connecting.on(CallTriggerKind::HungUp, |_, _, _| {
                    Outcome::TransitionTo(CallState::OnHook)
                });
            });

            off_hook.state(CallStateKind::Connected, |connected| {
                connected.on_entry(|scope| async move {
                    if let CallState::Connected { number, .. } = scope.new_state() {
                        tracing::info!("{} - connected to {}", scope.target().id(), number);
                    }
                });
                connected.on(CallTriggerKind::HungUp, |_, _, _| {
                    Outcome::TransitionTo(CallState::OnHook)
                });
            });

            off_hook.state(CallStateKind::Failed, |failed| {
                failed.on_entry(|scope| async move {
                    if let CallState::Failed { number, .. } = scope.new_state() {
                        tracing::warn!("{} - call to {} failed", scope.target().id(), number);
                    }
                });
                failed.on(CallTriggerKind::HungUp, |_, _, _| {
                    Outcome::TransitionTo(CallState::OnHook)
                });
            });
        })
        .build()
        .expect("call model declares each state once");

    Arc::new(graph)
}
