//! strata-demo - a telephony workflow on top of the strata engine.
//!
//! Lifts the handset, dials, lets validation and connection run their
//! course, then hangs up. Watch the light: the off-hook superstate turns
//! it on when any of its substates becomes active and off again when the
//! call returns on-hook.

mod handset;
mod model;

use clap::Parser;
use handset::Handset;
use model::{call_model, CallState, CallStateKind, CallTrigger};
use std::time::Duration;
use strata_core::Machine;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strata-demo", about = "Sample telephony workflow")]
struct Args {
    /// Number to dial.
    #[arg(long, default_value = "01234567890")]
    number: String,

    /// How long to stay on the call, in seconds.
    #[arg(long, default_value_t = 3)]
    talk_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let model = call_model();
    let machine = Machine::builder(model, Handset::new("handset-1"))
        .with_id("call-1")
        .start(CallState::OnHook)?;

    machine.fire(CallTrigger::PickedUp);
    machine.fire(CallTrigger::NumberDialled {
        number: args.number,
    });

    // Give validation and connection time to complete, then have a chat.
    tokio::time::sleep(Duration::from_secs(args.talk_secs)).await;

    if machine.is_in_state(CallStateKind::Connected)? {
        tracing::info!("call-1 - still connected after {}s, hanging up", args.talk_secs);
    }
    machine.fire(CallTrigger::HungUp);

    // Let the hang-up drain before shutting the machine down.
    tokio::time::sleep(Duration::from_millis(100)).await;
    machine.close();

    tracing::info!(
        "call-1 - done (back on hook: {}, light on: {})",
        machine.is_in_state(CallStateKind::OnHook)?,
        machine.target().light_on()
    );
    Ok(())
}
