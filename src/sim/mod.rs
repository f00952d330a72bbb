//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time is passed in, never read
//! - Randomness comes from an injected `RandomSource`
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod effects;
pub mod entity;
pub mod grid;
pub mod level;
pub mod progression;
pub mod rng;
pub mod shop;
pub mod snapshot;
pub mod spawner;
pub mod state;
pub mod tick;

pub use effects::{EffectKind, Grant, StatusEffects};
pub use entity::{ContactOutcome, Entity, EntityKind};
pub use grid::{BoundaryMode, Direction, Rect};
pub use level::{FeatureGateSet, LEVELS, LevelConfig, level_config};
pub use progression::{LevelOverrides, LevelSetup, advance_level, apply_config, new_run, preview_next};
pub use rng::{EntropySource, RandomSource, SeededSource, daily_seed};
pub use shop::{ShopItem, purchase};
pub use snapshot::{EntityView, Snapshot};
pub use spawner::spawn_free_cell;
pub use state::{GameEvent, GameOverCause, GameState, Objective, RunMode, RunPhase, Snake};
pub use tick::{advance, effective_interval, spend_warp_charge};
