//! Active modifier countdowns.

use std::fmt;
use std::sync::Arc;

use crate::modifiers::Modifier;

/// An enabled modifier paired with its remaining active duration.
#[derive(Clone)]
pub struct ActiveModifierCountdown {
    modifier: Arc<dyn Modifier>,
    remaining_seconds: f32,
}

impl ActiveModifierCountdown {
    pub fn new(modifier: Arc<dyn Modifier>, duration_seconds: f32) -> Self {
        Self {
            modifier,
            remaining_seconds: duration_seconds,
        }
    }

    pub fn modifier(&self) -> &Arc<dyn Modifier> {
        &self.modifier
    }

    pub fn remaining_seconds(&self) -> f32 {
        self.remaining_seconds
    }

    /// Counts down by the frame delta and returns `true` once expired.
    ///
    /// Expiry is strictly below zero, so a countdown of `D` seconds survives
    /// ticks summing to exactly `D`.
    pub fn advance(&mut self, delta: f32) -> bool {
        self.remaining_seconds -= delta;
        self.remaining_seconds < 0.
    }
}

impl fmt::Debug for ActiveModifierCountdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveModifierCountdown")
            .field("modifier", &self.modifier.display_name())
            .field("remaining_seconds", &self.remaining_seconds)
            .finish()
    }
}
