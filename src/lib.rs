//! Star Snake - A space-themed grid snake arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (movement, collisions, entities, levels)
//! - `session`: One run of the game: intents, tick pacing, snapshots
//! - `persistence`: Key/value storage boundary
//! - `platform`: Wall-clock date (browser or native)
//! - `settings`: Player preferences
//! - `highscores`: High score and local leaderboard
//! - `web`: JavaScript bindings (wasm32 only)

pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use highscores::HighScores;
pub use session::{Intent, Session};
pub use settings::{Difficulty, Preferences};

use glam::IVec2;

/// Game configuration constants (all times in milliseconds)
pub mod consts {
    /// Fastest score-driven tick interval
    pub const MIN_TICK_INTERVAL_MS: f64 = 60.0;
    /// Maximum amount the score ramp can shave off the base interval
    pub const MAX_SPEED_RAMP_MS: f64 = 80.0;
    /// Interval reduction per point of score
    pub const SPEED_RAMP_PER_POINT_MS: f64 = 1.5;
    /// Floor for time-field intervals
    pub const MIN_TIME_FIELD_INTERVAL_MS: f64 = 50.0;
    /// Speed-boost interval multiplier (shorter = faster)
    pub const SPEED_BOOST_FACTOR: f64 = 0.7;
    /// Slow-mo effective interval multiplier
    pub const SLOWMO_FACTOR: f64 = 2.0;

    /// Spawner attempt bound before giving up for this tick
    pub const SPAWN_ATTEMPTS: u32 = 200;

    /// Obstacles
    pub const MAX_OBSTACLES: usize = 20;
    pub const SCORE_PER_OBSTACLE: u64 = 4;
    pub const LEVEL_START_EXTRA_OBSTACLES: usize = 2;

    /// Grace windows
    pub const PORTAL_GRACE_MS: f64 = 600.0;
    pub const WARP_GATE_GRACE_MS: f64 = 600.0;
    pub const BLACK_HOLE_GRACE_MS: f64 = 800.0;
    pub const SHIELD_BREAK_GRACE_MS: f64 = 1000.0;
    pub const COMET_GRACE_MS: f64 = 4000.0;

    /// Combo multiplier
    pub const COMBO_WINDOW_MS: f64 = 3000.0;
    pub const MAX_COMBO: u32 = 5;

    /// Collectibles
    pub const BONUS_STAR_CHANCE: f64 = 0.25;
    pub const BONUS_STAR_LIFETIME_MS: f64 = 3500.0;
    pub const BONUS_STAR_POINTS: u64 = 5;
    pub const BONUS_STARDUST_CHANCE: f64 = 0.4;
    pub const EXTRA_STAR_CHANCE: f64 = 0.1;
    pub const MAX_EXTRA_STARS: usize = 2;
    pub const WIDE_STAR_CHANCE: f64 = 0.02;
    pub const WIDE_STAR_LIFETIME_MS: f64 = 8000.0;
    pub const WIDE_STAR_POINTS: u64 = 2;
    pub const BLINK_STAR_CHANCE: f64 = 0.02;
    pub const BLINK_STAR_LIFETIME_MS: f64 = 9000.0;
    pub const BLINK_PERIOD_MS: f64 = 1000.0;
    pub const BLINK_STAR_POINTS: u64 = 3;
    pub const RING_STAR_CHANCE: f64 = 0.015;
    pub const RING_STAR_LIFETIME_MS: f64 = 7000.0;
    pub const RING_STAR_POINTS: u64 = 4;
    pub const NOVA_CORE_CHANCE: f64 = 0.01;
    pub const NOVA_CORE_LIFETIME_MS: f64 = 10_000.0;
    pub const NOVA_CORE_POINTS: u64 = 5;
    pub const NOVA_CLEAR_RADIUS: i32 = 2;
    pub const QUANTUM_PAIR_CHANCE: f64 = 0.01;
    pub const QUANTUM_PAIR_LIFETIME_MS: f64 = 15_000.0;
    pub const QUANTUM_WINDOW_MS: f64 = 2000.0;
    pub const QUANTUM_PAIR_POINTS: u64 = 4;
    pub const CONSTELLATION_CHANCE: f64 = 0.008;
    pub const CONSTELLATION_LIFETIME_MS: f64 = 20_000.0;
    pub const CONSTELLATION_POINTS: u64 = 6;
    pub const POWER_STAR_CHANCE: f64 = 0.02;
    pub const POWER_STAR_LIFETIME_MS: f64 = 10_000.0;
    pub const MAX_POWER_STARS: usize = 2;

    /// Drone pickup reach (Manhattan)
    pub const DRONE_REACH: i32 = 2;
    /// Magnet pull reach (Manhattan)
    pub const MAGNET_REACH: i32 = 5;

    /// Comet
    pub const COMET_CHANCE: f64 = 0.04;
    pub const COMET_LIFETIME_MS: f64 = 8000.0;
    pub const COMET_MOVE_INTERVAL_MS: f64 = 100.0;
    pub const COMET_POINTS: u64 = 3;

    /// Meteor showers
    pub const FIRST_METEOR_SHOWER_MS: f64 = 20_000.0;
    pub const METEOR_SHOWER_DURATION_MS: f64 = 6000.0;
    pub const METEOR_SPAWN_INTERVAL_MS: f64 = 200.0;
    pub const METEOR_COOLDOWN_MS: f64 = 22_000.0;
    pub const METEOR_COOLDOWN_JITTER_MS: f64 = 8000.0;

    /// Black holes
    pub const FIRST_BLACK_HOLE_MS: f64 = 25_000.0;
    pub const BLACK_HOLE_LIFETIME_MS: f64 = 10_000.0;
    pub const BLACK_HOLE_COOLDOWN_MS: f64 = 25_000.0;
    pub const BLACK_HOLE_COOLDOWN_JITTER_MS: f64 = 10_000.0;
    pub const MAX_BLACK_HOLES: usize = 3;

    /// Planets and winds
    pub const GRAVITY_PULL_CHANCE: f64 = 0.25;
    pub const WIND_PUSH_CHANCE: f64 = 0.3;
    pub const WARP_GATE_CHANCE: f64 = 0.9;

    /// Asteroid belt: rocks where (x + offset) % period < rocks
    pub const BELT_PERIOD: i32 = 5;
    pub const BELT_ROCKS: i32 = 2;
    pub const BELT_SCROLL_INTERVAL_MS: f64 = 300.0;

    /// Rush mode countdown
    pub const RUSH_DURATION_MS: f64 = 60_000.0;

    /// Shop
    pub const SHOP_COST: u32 = 5;
}

/// A grid cell (x grows right, y grows down)
pub type Cell = IVec2;

/// Manhattan distance between two cells
#[inline]
pub fn manhattan(a: Cell, b: Cell) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Wrap a cell onto a square grid of side `size` (toroidal)
#[inline]
pub fn wrap_cell(cell: Cell, size: i32) -> Cell {
    Cell::new(cell.x.rem_euclid(size), cell.y.rem_euclid(size))
}

/// Whether a cell lies inside a square grid of side `size`
#[inline]
pub fn in_bounds(cell: Cell, size: i32) -> bool {
    cell.x >= 0 && cell.y >= 0 && cell.x < size && cell.y < size
}
