//! Entity spawner
//!
//! Every placement draws uniform cells and rejects reserved ones. The attempt
//! count is bounded: a crowded grid makes a spawn fail for this tick, and the
//! caller simply tries again later.

use std::collections::HashSet;

use super::effects::EffectKind;
use super::entity::EntityKind;
use super::grid::{Direction, Rect};
use super::rng::RandomSource;
use super::state::GameState;
use crate::consts::*;
use crate::{Cell, manhattan};

/// Pick a random cell not in `excluded`, giving up after `SPAWN_ATTEMPTS`
pub fn spawn_free_cell(
    rng: &mut dyn RandomSource,
    grid_size: i32,
    excluded: &HashSet<Cell>,
) -> Option<Cell> {
    for _ in 0..SPAWN_ATTEMPTS {
        let cell = Cell::new(rng.below(grid_size), rng.below(grid_size));
        if !excluded.contains(&cell) {
            return Some(cell);
        }
    }
    None
}

/// Reserved cells for hazards: everything, plus a short lane ahead of the head
fn hazard_exclusions(state: &GameState) -> HashSet<Cell> {
    let mut excluded = state.reserved_cells(true);
    let head = state.snake.head();
    let step = state.snake.direction.step();
    for i in 1..=3 {
        excluded.insert(head + step * i);
    }
    excluded
}

/// Free cell for a collectible
pub fn collectible_cell(state: &GameState, rng: &mut dyn RandomSource) -> Option<Cell> {
    spawn_free_cell(rng, state.grid_size, &state.reserved_cells(true))
}

/// Free cell to drop the head onto after a teleport. Avoids every lethal or
/// teleporting cell so a warp never chains into another event.
pub fn safe_cell(state: &GameState, rng: &mut dyn RandomSource) -> Option<Cell> {
    let mut excluded = state.reserved_cells(false);
    excluded.extend(
        state
            .entities
            .iter()
            .filter(|e| e.hazard().is_some())
            .flat_map(|e| e.cells()),
    );
    spawn_free_cell(rng, state.grid_size, &excluded)
}

/// Respawn the primary star. Returns false if no cell was free.
pub fn respawn_star(state: &mut GameState, rng: &mut dyn RandomSource) -> bool {
    let excluded = state.reserved_cells(false);
    match spawn_free_cell(rng, state.grid_size, &excluded) {
        Some(cell) => {
            state.star = cell;
            state.star_respawn_pending = false;
            true
        }
        None => {
            log::debug!("Star respawn failed, retrying next tick");
            state.star_respawn_pending = true;
            false
        }
    }
}

/// Obstacle target for a score
pub fn desired_obstacle_count(score: u64) -> usize {
    ((score / SCORE_PER_OBSTACLE) as usize).min(MAX_OBSTACLES)
}

pub fn spawn_obstacle(state: &mut GameState, rng: &mut dyn RandomSource) -> bool {
    let excluded = hazard_exclusions(state);
    match spawn_free_cell(rng, state.grid_size, &excluded) {
        Some(cell) => {
            state.add_entity(EntityKind::Asteroid { cell });
            true
        }
        None => false,
    }
}

/// Add asteroids until `target` exist or a spawn fails
pub fn grow_obstacles(state: &mut GameState, rng: &mut dyn RandomSource, target: usize) {
    let target = target.min(MAX_OBSTACLES + LEVEL_START_EXTRA_OBSTACLES);
    while state.obstacle_count() < target {
        if !spawn_obstacle(state, rng) {
            break;
        }
    }
}

pub fn spawn_extra_star(state: &mut GameState, rng: &mut dyn RandomSource) -> bool {
    match collectible_cell(state, rng) {
        Some(cell) => {
            state.add_entity(EntityKind::ExtraStar { cell });
            true
        }
        None => false,
    }
}

pub fn spawn_bonus_star(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    match collectible_cell(state, rng) {
        Some(cell) => {
            state.add_entity(EntityKind::BonusStar {
                cell,
                expires_at: now + BONUS_STAR_LIFETIME_MS,
            });
            true
        }
        None => false,
    }
}

pub fn spawn_wide_star(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    let excluded = state.reserved_cells(true);
    for _ in 0..SPAWN_ATTEMPTS {
        let left = Cell::new(rng.below(state.grid_size - 1), rng.below(state.grid_size));
        if !excluded.contains(&left) && !excluded.contains(&(left + Cell::X)) {
            state.add_entity(EntityKind::WideStar {
                left,
                expires_at: now + WIDE_STAR_LIFETIME_MS,
            });
            return true;
        }
    }
    false
}

pub fn spawn_blink_star(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    match collectible_cell(state, rng) {
        Some(cell) => {
            state.add_entity(EntityKind::BlinkStar {
                cell,
                born_at: now,
                expires_at: now + BLINK_STAR_LIFETIME_MS,
            });
            true
        }
        None => false,
    }
}

pub fn spawn_ring_star(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    match collectible_cell(state, rng) {
        Some(cell) => {
            state.add_entity(EntityKind::RingStar {
                cell,
                expires_at: now + RING_STAR_LIFETIME_MS,
            });
            true
        }
        None => false,
    }
}

pub fn spawn_nova_core(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    match collectible_cell(state, rng) {
        Some(cell) => {
            state.add_entity(EntityKind::NovaCore {
                cell,
                expires_at: now + NOVA_CORE_LIFETIME_MS,
            });
            true
        }
        None => false,
    }
}

/// Draw `count` distinct free cells, or none at all
fn distinct_cells(
    state: &GameState,
    rng: &mut dyn RandomSource,
    count: usize,
) -> Option<Vec<Cell>> {
    let mut excluded = state.reserved_cells(true);
    let mut cells = Vec::with_capacity(count);
    for _ in 0..count {
        let cell = spawn_free_cell(rng, state.grid_size, &excluded)?;
        excluded.insert(cell);
        cells.push(cell);
    }
    Some(cells)
}

pub fn spawn_quantum_pair(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    match distinct_cells(state, rng, 2) {
        Some(cells) => {
            state.add_entity(EntityKind::QuantumPair {
                a: cells[0],
                b: cells[1],
                armed: None,
                expires_at: now + QUANTUM_PAIR_LIFETIME_MS,
            });
            true
        }
        None => false,
    }
}

pub fn spawn_constellation(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    let count = 3 + rng.below(2) as usize;
    match distinct_cells(state, rng, count) {
        Some(points) => {
            state.add_entity(EntityKind::Constellation {
                points,
                next: 0,
                expires_at: now + CONSTELLATION_LIFETIME_MS,
            });
            true
        }
        None => false,
    }
}

/// Power star with a kind drawn from the level's unlocked set
pub fn spawn_power_star(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    if state.power_kinds.is_empty() {
        return false;
    }
    let effect: EffectKind = state.power_kinds[rng.below(state.power_kinds.len() as i32) as usize];
    match collectible_cell(state, rng) {
        Some(cell) => {
            state.add_entity(EntityKind::PowerStar {
                cell,
                effect,
                expires_at: now + POWER_STAR_LIFETIME_MS,
            });
            true
        }
        None => false,
    }
}

pub fn spawn_comet(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    let Some(cell) = collectible_cell(state, rng) else {
        return false;
    };
    let dx = if rng.chance(0.5) { 1 } else { -1 };
    let dy = if rng.chance(0.5) { 1 } else { -1 };
    state.add_entity(EntityKind::Comet {
        cell,
        velocity: Cell::new(dx, dy),
        expires_at: now + COMET_LIFETIME_MS,
        last_move_at: now,
    });
    true
}

/// Meteors enter at the top row of a random column
pub fn spawn_meteor(state: &mut GameState, rng: &mut dyn RandomSource) {
    let cell = Cell::new(rng.below(state.grid_size), 0);
    state.add_entity(EntityKind::Meteor { cell });
}

pub fn spawn_black_hole(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    let excluded = hazard_exclusions(state);
    match spawn_free_cell(rng, state.grid_size, &excluded) {
        Some(cell) => {
            state.add_entity(EntityKind::BlackHole {
                cell,
                expires_at: now + BLACK_HOLE_LIFETIME_MS,
            });
            true
        }
        None => false,
    }
}

/// Square zone of side `side` that does not cover the head
fn zone(state: &GameState, rng: &mut dyn RandomSource, side: i32) -> Option<Rect> {
    let head = state.snake.head();
    let span = state.grid_size - side + 1;
    for _ in 0..SPAWN_ATTEMPTS {
        let min = Cell::new(rng.below(span), rng.below(span));
        let rect = Rect::new(min, min + Cell::splat(side - 1));
        if !rect.contains(head) {
            return Some(rect);
        }
    }
    None
}

/// Static per-level entities: planets, gates, fields, belt, mines and the
/// reserved zones. Called once when a level is armed.
pub fn spawn_level_fixtures(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) {
    let gates = state.gates;

    if gates.planets {
        let count = 1 + rng.below(2);
        for _ in 0..count {
            if let Some(cell) = spawn_free_cell(rng, state.grid_size, &hazard_exclusions(state)) {
                let radius = 2 + rng.below(2);
                state.add_entity(EntityKind::Planet { cell, radius });
            }
        }
    }

    if gates.warp_gates && rng.chance(WARP_GATE_CHANCE) {
        if let Some(cells) = distinct_cells(state, rng, 2) {
            state.add_entity(EntityKind::WarpGate {
                a: cells[0],
                b: cells[1],
            });
        }
    }

    if gates.one_way_gates {
        if let Some(cells) = distinct_cells(state, rng, 2) {
            state.add_entity(EntityKind::OneWayGate {
                from: cells[0],
                to: cells[1],
            });
        }
    }

    if gates.time_fields {
        let side = 3 + rng.below(2);
        if let Some(area) = zone(state, rng, side) {
            let factor = if rng.chance(0.5) { 0.6 } else { 1.6 };
            state.add_entity(EntityKind::TimeField { area, factor });
        }
    }

    if gates.asteroid_belt {
        let head_row = state.snake.head().y;
        for _ in 0..SPAWN_ATTEMPTS {
            let row = rng.below(state.grid_size);
            if (row - head_row).abs() > 2 && row != state.star.y {
                state.add_entity(EntityKind::AsteroidBelt {
                    row,
                    width: state.grid_size,
                    offset: rng.below(BELT_PERIOD),
                    last_scroll_at: now,
                });
                break;
            }
        }
    }

    if gates.space_mines {
        let count = 2 + rng.below(3);
        for _ in 0..count {
            if let Some(cell) = spawn_free_cell(rng, state.grid_size, &hazard_exclusions(state)) {
                state.add_entity(EntityKind::SpaceMine { cell });
            }
        }
    }

    if gates.solar_wind {
        let top = rng.below(state.grid_size - 2);
        let push = Direction::ALL[rng.below(4) as usize];
        state.add_entity(EntityKind::SolarWind {
            top,
            bottom: top + 2,
            push,
        });
    }

    if gates.radiation_zones {
        if let Some(area) = zone(state, rng, 3) {
            state.add_entity(EntityKind::RadiationZone { area });
        }
    }
}

/// Remove asteroids and mines within `radius` (Manhattan) of `center`
pub fn clear_hazards_near(state: &mut GameState, center: Cell, radius: i32) -> usize {
    let before = state.entities.len();
    state.entities.retain(|e| match e.kind {
        EntityKind::Asteroid { cell } | EntityKind::SpaceMine { cell } => {
            manhattan(cell, center) > radius
        }
        _ => true,
    });
    before - state.entities.len()
}
