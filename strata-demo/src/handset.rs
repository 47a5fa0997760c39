//! The object whose state the call machine drives (the target).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A handset with an in-use light. Entry and exit actions on the
/// off-hook superstate toggle the light; validation and connection are
/// slow, fallible lookups stubbed out with sleeps.
pub struct Handset {
    id: String,
    light_on: AtomicBool,
}

impl Handset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            light_on: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn light_on(&self) -> bool {
        self.light_on.load(Ordering::Relaxed)
    }

    pub fn turn_on_light(&self) {
        tracing::info!("{} - turning light on", self.id);
        self.light_on.store(true, Ordering::Relaxed);
    }

    pub fn turn_off_light(&self) {
        tracing::info!("{} - turning light off", self.id);
        self.light_on.store(false, Ordering::Relaxed);
    }

    /// Checks whether a dialled number is routable.
    pub async fn validate(&self, number: &str) -> bool {
        tokio::time::sleep(Duration::from_millis(500)).await;
        !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
    }

    /// Attempts to establish the call.
    pub async fn connect(&self, number: &str) -> bool {
        tracing::info!("{} - dialling {}", self.id, number);
        tokio::time::sleep(Duration::from_millis(750)).await;
        true
    }
}
