//! Settings management

use anyhow::{Context, Result};
use quarry_core::ecs::WorldConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no settings path is given on the
/// command line.
pub const SETTINGS_ENV: &str = "QUARRY_SETTINGS";

/// Runtime settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub world: WorldConfig,
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_rate_hz: u32,
    /// Frames to simulate before exiting.
    pub frames: u64,
    pub spawn_per_frame: usize,
    /// Spawning pauses while this many entities are alive.
    pub max_live: usize,
    /// Seconds a spawned entity lives.
    pub lifetime_secs: f32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            frames: 600,
            spawn_per_frame: 500,
            max_live: 50_000,
            lifetime_secs: 3.0,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or fall back to defaults when there is none.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::info!("No settings file given, using defaults");
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let settings = Self::from_json(&text)
            .with_context(|| format!("failed to parse settings in {}", path.display()))?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Settings path from the first command-line argument, else from
/// [`SETTINGS_ENV`].
pub fn settings_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(SETTINGS_ENV))
        .map(PathBuf::from)
}
