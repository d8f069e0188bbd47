//! On-disk settings.
//!
//! Stored as JSON next to the mod's installation. Every field has a default,
//! so old settings files keep loading after new fields are added.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{self, Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModConfig {
    pub poll: PollSettings,
    pub twitch: TwitchSettings,
}

/// Timings and sizing of the poll rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// How long a poll collects votes.
    pub poll_time_seconds: f32,
    /// Pause between closing a poll and activating the winner.
    pub poll_closed_time_seconds: f32,
    /// Downtime after a round before the next poll starts.
    pub time_between_polls_seconds: f32,
    /// How long a winning modifier stays active.
    pub active_duration_seconds: f32,
    /// Candidates per poll. Votes are single digits, so anything above 9 is
    /// clamped down at poll creation.
    pub max_choices: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_time_seconds: 20.,
            poll_closed_time_seconds: 2.5,
            time_between_polls_seconds: 2.5,
            active_duration_seconds: 30.,
            max_choices: 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchSettings {
    /// Channel to read chat from. Empty disables the Twitch client.
    pub channel: String,
}

impl ModConfig {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("error reading {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("error parsing {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> eyre::Result<()> {
        let contents = serde_json::to_string_pretty(self).context("error serializing settings")?;
        fs::write(path, contents).with_context(|| format!("error writing {}", path.display()))
    }
}
