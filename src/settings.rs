//! Player preferences
//!
//! Persisted as one JSON value. Unknown or missing fields take their defaults
//! so older saves keep loading.

use serde::{Deserialize, Serialize};

use crate::persistence::{self, KeyValueStore, PREFERENCES_KEY, StoreError};
use crate::sim::grid::BoundaryMode;
use crate::sim::progression::LevelOverrides;
use crate::sim::state::RunMode;

/// Base speed preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Gentle,
    Brutal,
    #[default]
    #[serde(other)]
    Standard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Gentle => "Gentle",
            Difficulty::Standard => "Standard",
            Difficulty::Brutal => "Brutal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gentle" | "easy" => Some(Difficulty::Gentle),
            "standard" | "normal" => Some(Difficulty::Standard),
            "brutal" | "hard" => Some(Difficulty::Brutal),
            _ => None,
        }
    }

    /// Reference tick interval for this preset
    pub fn base_interval_ms(&self) -> f64 {
        match self {
            Difficulty::Gentle => 150.0,
            Difficulty::Standard => 120.0,
            Difficulty::Brutal => 95.0,
        }
    }

    /// Multiplier on every level's base interval
    pub fn tick_scale(&self) -> f64 {
        self.base_interval_ms() / Difficulty::Standard.base_interval_ms()
    }
}

/// Game preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Force a boundary mode on every level
    pub boundary: Option<BoundaryMode>,
    pub obstacles: bool,
    /// Sound playback belongs to the host
    pub sound: bool,
    pub mode: RunMode,
    /// Force a grid size on every level
    pub grid_size: Option<i32>,
    pub difficulty: Difficulty,
    /// Cosmetic theme name, recorded with leaderboard entries
    pub theme: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            boundary: None,
            obstacles: true,
            sound: true,
            mode: RunMode::Classic,
            grid_size: None,
            difficulty: Difficulty::Standard,
            theme: "nebula".to_string(),
        }
    }
}

impl Preferences {
    /// How these preferences reshape the level catalog
    pub fn level_overrides(&self) -> LevelOverrides {
        LevelOverrides {
            grid_size: self.grid_size,
            boundary: self.boundary,
            obstacles_enabled: self.obstacles,
            tick_scale: self.difficulty.tick_scale(),
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        let prefs: Self = persistence::load_json(store, PREFERENCES_KEY);
        log::info!(
            "Preferences: mode {}, difficulty {}",
            prefs.mode.as_str(),
            prefs.difficulty.as_str()
        );
        prefs
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        persistence::save_json(store, PREFERENCES_KEY, self)
    }
}
