//! Level progression
//!
//! `apply_config` derives everything a level needs from the catalog. It is
//! pure, so previewing the next level is just calling it with `index + 1`.
//! `start_level` then arms a state with the derived setup.

use super::effects::EffectKind;
use super::grid::BoundaryMode;
use super::level::{FeatureGateSet, last_level_index, level_config};
use super::rng::RandomSource;
use super::spawner;
use super::state::{GameEvent, GameState, Objective, RunMode, RunPhase, Snake};
use super::tick::score_tick_interval;
use crate::consts::*;

/// Smallest and largest grid a preference may force
pub const GRID_SIZE_RANGE: (i32, i32) = (16, 24);

/// Player preferences that reshape the catalog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelOverrides {
    pub grid_size: Option<i32>,
    pub boundary: Option<BoundaryMode>,
    /// Obstacles only appear if both the level and the player allow them
    pub obstacles_enabled: bool,
    /// Multiplier on the base tick interval (difficulty)
    pub tick_scale: f64,
}

impl Default for LevelOverrides {
    fn default() -> Self {
        Self {
            grid_size: None,
            boundary: None,
            obstacles_enabled: true,
            tick_scale: 1.0,
        }
    }
}

/// Everything derived from one catalog entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSetup {
    pub level_index: usize,
    pub grid_size: i32,
    pub base_tick_interval_ms: f64,
    pub boundary: BoundaryMode,
    pub obstacles_enabled: bool,
    pub gates: FeatureGateSet,
    pub power_kinds: &'static [EffectKind],
    pub star_target: u32,
}

/// Derive a level's setup. Indices past the end clamp to the final level.
pub fn apply_config(level_index: usize, overrides: &LevelOverrides) -> LevelSetup {
    let level_index = level_index.min(last_level_index());
    let config = level_config(level_index);
    let (min_grid, max_grid) = GRID_SIZE_RANGE;
    LevelSetup {
        level_index,
        grid_size: overrides
            .grid_size
            .unwrap_or(config.grid_size)
            .clamp(min_grid, max_grid),
        base_tick_interval_ms: config.base_tick_interval_ms * overrides.tick_scale.max(0.1),
        boundary: overrides.boundary.unwrap_or(config.boundary),
        obstacles_enabled: config.obstacles_enabled && overrides.obstacles_enabled,
        gates: config.gates,
        power_kinds: config.power_kinds,
        star_target: config.star_target,
    }
}

/// Setup of the level after the current one, without touching the state
pub fn preview_next(state: &GameState, overrides: &LevelOverrides) -> LevelSetup {
    apply_config(state.level_index + 1, overrides)
}

/// Arm `state` with a level: config, fresh snake, new entity sets and timers.
/// Score, stardust and status effects carry over.
pub fn start_level(
    state: &mut GameState,
    setup: &LevelSetup,
    rng: &mut dyn RandomSource,
    now: f64,
    extra_obstacles: usize,
) {
    state.level_index = setup.level_index;
    state.grid_size = setup.grid_size;
    state.boundary = setup.boundary;
    state.base_tick_interval_ms = setup.base_tick_interval_ms;
    state.obstacles_enabled = setup.obstacles_enabled;
    state.gates = setup.gates;
    state.power_kinds = setup.power_kinds.to_vec();
    state.objective = Objective::collect(setup.star_target);

    state.snake = Snake::spawn(setup.grid_size);
    state.entities.clear();
    state.star_respawn_pending = false;
    spawner::respawn_star(state, rng);

    if state.obstacles_enabled {
        let target = spawner::desired_obstacle_count(state.score) + extra_obstacles;
        spawner::grow_obstacles(state, rng, target);
    }
    spawner::spawn_level_fixtures(state, rng, now);

    state.meteor_shower_until = 0.0;
    state.last_meteor_spawn_at = 0.0;
    state.next_meteor_shower_at = now + FIRST_METEOR_SHOWER_MS;
    state.next_black_hole_at = now + FIRST_BLACK_HOLE_MS;
    state.tick_interval_ms = score_tick_interval(state.base_tick_interval_ms, state.score);
    state.last_tick_at = now;
    state.normalize_order();

    log::info!(
        "Level {}: grid {} {} boundary, {} gates, collect {} stars",
        setup.level_index + 1,
        setup.grid_size,
        setup.boundary.as_str(),
        setup.gates.enabled_count(),
        setup.star_target
    );
    state.push_event(GameEvent::LevelStarted {
        level: setup.level_index,
    });
}

/// Fresh run on `level_index`, waiting in `Intro`
pub fn new_run(
    level_index: usize,
    overrides: &LevelOverrides,
    mode: RunMode,
    rng: &mut dyn RandomSource,
    now: f64,
) -> GameState {
    let setup = apply_config(level_index, overrides);
    let mut state = GameState::blank(setup.grid_size, setup.boundary, mode);
    start_level(&mut state, &setup, rng, now, 0);
    state
}

/// Discard the run and start over on the current level
pub fn reset_run(
    state: &mut GameState,
    overrides: &LevelOverrides,
    rng: &mut dyn RandomSource,
    now: f64,
) {
    let mode = state.mode;
    *state = new_run(state.level_index, overrides, mode, rng, now);
}

/// Move from `LevelComplete` to the next level and resume.
/// Past the last catalog entry the final level repeats.
pub fn advance_level(
    state: &mut GameState,
    overrides: &LevelOverrides,
    rng: &mut dyn RandomSource,
    now: f64,
) -> usize {
    let setup = preview_next(state, overrides);
    start_level(state, &setup, rng, now, LEVEL_START_EXTRA_OBSTACLES);
    state.phase = RunPhase::Running;
    setup.level_index
}
