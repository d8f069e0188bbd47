//! Modifiers that modify the poll trigger itself.
//!
//! These are regular poll candidates, but instead of touching the game they
//! scale the trigger's own cadence and durations through its [`Tunables`]
//! handle. The scales are read at the moment of use, so enabling one
//! mid-round affects the next poll or the next winner activation.

use std::sync::atomic::{AtomicBool, Ordering};

use super::Modifier;
use crate::trigger::Tunables;

/// Halves the downtime between polls.
pub struct RapidPolls {
    tunables: Tunables,
    enabled: AtomicBool,
}

impl RapidPolls {
    pub const POLL_INTERVAL_SCALE: f32 = 0.5;

    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            enabled: AtomicBool::new(false),
        }
    }
}

impl Modifier for RapidPolls {
    fn display_name(&self) -> &str {
        "Rapid polls"
    }

    fn enable(&self) -> bool {
        if self.enabled.swap(true, Ordering::SeqCst) {
            warn!("Rapid polls is already enabled.");
            return false;
        }

        self.tunables.set_poll_interval_scale(Self::POLL_INTERVAL_SCALE);
        true
    }

    fn disable(&self) -> bool {
        if !self.enabled.swap(false, Ordering::SeqCst) {
            warn!("Rapid polls is already disabled.");
            return false;
        }

        self.tunables.set_poll_interval_scale(1.);
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// Doubles how long winning modifiers stay active.
pub struct LingeringEffects {
    tunables: Tunables,
    enabled: AtomicBool,
}

impl LingeringEffects {
    pub const DURATION_SCALE: f32 = 2.;

    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            enabled: AtomicBool::new(false),
        }
    }
}

impl Modifier for LingeringEffects {
    fn display_name(&self) -> &str {
        "Lingering effects"
    }

    fn enable(&self) -> bool {
        if self.enabled.swap(true, Ordering::SeqCst) {
            warn!("Lingering effects is already enabled.");
            return false;
        }

        self.tunables.set_duration_scale(Self::DURATION_SCALE);
        true
    }

    fn disable(&self) -> bool {
        if !self.enabled.swap(false, Ordering::SeqCst) {
            warn!("Lingering effects is already disabled.");
            return false;
        }

        self.tunables.set_duration_scale(1.);
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}
