//! Read-only view of a run for the presentation layer

use serde::Serialize;

use super::effects::{EffectKind, Expiry};
use super::entity::{Entity, EntityKind, belt_rock_at, blink_visible};
use super::grid::BoundaryMode;
use super::state::{GameOverCause, GameState, Objective, RunMode, RunPhase};
use crate::Cell;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub id: u32,
    pub kind: &'static str,
    /// Cells to draw right now (belt rocks only, blink stars only while lit)
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectView {
    pub kind: EffectKind,
    pub remaining_ms: Option<f64>,
    pub charges: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: RunPhase,
    pub mode: RunMode,
    pub level: usize,
    pub grid_size: i32,
    pub boundary: BoundaryMode,
    pub body: Vec<Cell>,
    pub star: Option<Cell>,
    pub entities: Vec<EntityView>,
    pub score: u64,
    pub high_score: u64,
    pub stardust: u32,
    pub objective: Objective,
    pub combo: u32,
    pub effects: Vec<EffectView>,
    pub invincible: bool,
    pub rush_remaining_ms: Option<f64>,
    pub game_over: Option<GameOverCause>,
}

fn view_cells(entity: &Entity, now: f64) -> Vec<Cell> {
    match &entity.kind {
        EntityKind::AsteroidBelt {
            row, width, offset, ..
        } => (0..*width)
            .filter(|x| belt_rock_at(*x, *offset))
            .map(|x| Cell::new(x, *row))
            .collect(),
        EntityKind::BlinkStar { cell, born_at, .. } => {
            if blink_visible(*born_at, now) {
                vec![*cell]
            } else {
                Vec::new()
            }
        }
        EntityKind::TimeField { area, .. } | EntityKind::RadiationZone { area } => {
            area.cells().collect()
        }
        _ => entity.cells(),
    }
}

impl Snapshot {
    pub fn capture(state: &GameState, high_score: u64, now: f64) -> Self {
        let entities = state
            .entities
            .iter()
            .map(|e| EntityView {
                id: e.id,
                kind: e.name(),
                cells: view_cells(e, now),
            })
            .collect();

        let effects = state
            .effects
            .active(now)
            .map(|(kind, expiry)| match expiry {
                Expiry::Until(_) => EffectView {
                    kind,
                    remaining_ms: Some(state.effects.remaining_ms(kind, now)),
                    charges: None,
                },
                Expiry::Charges(c) => EffectView {
                    kind,
                    remaining_ms: None,
                    charges: Some(c),
                },
                Expiry::Armed => EffectView {
                    kind,
                    remaining_ms: None,
                    charges: None,
                },
            })
            .collect();

        Self {
            phase: state.phase,
            mode: state.mode,
            level: state.level_index,
            grid_size: state.grid_size,
            boundary: state.boundary,
            body: state.snake.body.iter().copied().collect(),
            star: (!state.star_respawn_pending).then_some(state.star),
            entities,
            score: state.score,
            high_score: high_score.max(state.score),
            stardust: state.stardust,
            objective: state.objective,
            combo: state.combo,
            effects,
            invincible: state.effects.in_grace(now),
            rush_remaining_ms: (state.mode == RunMode::Rush).then_some(state.rush_remaining_ms),
            game_over: state.game_over_cause,
        }
    }
}
