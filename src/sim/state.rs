//! Game state and core simulation types
//!
//! Everything a run needs lives in `GameState`; nothing is global.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::effects::{EffectKind, StatusEffects};
use super::entity::{Entity, EntityKind};
use super::grid::{BoundaryMode, Direction};
use super::level::FeatureGateSet;
use crate::Cell;
use crate::consts::RUSH_DURATION_MS;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Waiting for the first input / acknowledgment
    Intro,
    /// Active gameplay
    Running,
    /// Game is paused
    Paused,
    /// Objective met, waiting for the next level to be armed
    LevelComplete,
    /// Run ended
    GameOver,
}

/// Game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// 60 second countdown
    Rush,
    /// Seeded random source derived from the date
    Daily,
    /// Unknown stored names load as classic
    #[default]
    #[serde(other)]
    Classic,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Classic => "classic",
            RunMode::Rush => "rush",
            RunMode::Daily => "daily",
        }
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverCause {
    Wall,
    SelfBite,
    Obstacle,
    Meteor,
    TimeUp,
}

impl GameOverCause {
    pub fn message(&self) -> &'static str {
        match self {
            GameOverCause::Wall => "You hit a wall",
            GameOverCause::SelfBite => "You bit yourself",
            GameOverCause::Obstacle => "You hit an obstacle",
            GameOverCause::Meteor => "Struck by a meteor",
            GameOverCause::TimeUp => "Time's up!",
        }
    }
}

/// Level objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub target: u32,
    pub progress: u32,
}

impl Objective {
    pub fn collect(target: u32) -> Self {
        Self {
            target,
            progress: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.target
    }
}

/// Things that happened during a tick, drained by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    LevelStarted { level: usize },
    StarEaten { cell: Cell, points: u64 },
    Collected { kind: &'static str, cell: Cell, points: u64 },
    ComboUp { multiplier: u32 },
    EffectGranted { effect: EffectKind },
    ShieldBroken,
    Warped { from: Cell, to: Cell },
    ObstaclesCleared { count: usize },
    Celebration { cell: Cell },
    MeteorShower,
    LevelComplete { level: usize },
    GameOver { cause: GameOverCause, score: u64 },
}

/// The snake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snake {
    /// Body segments, head first
    pub body: VecDeque<Cell>,
    /// Applied on the last tick
    pub direction: Direction,
    /// Applied on the next tick
    pub queued: Direction,
}

impl Snake {
    /// Snake of `length` cells trailing behind `head`
    pub fn new(head: Cell, direction: Direction, length: usize) -> Self {
        let back = direction.opposite().step();
        let body = (0..length as i32).map(|i| head + back * i).collect();
        Self {
            body,
            direction,
            queued: direction,
        }
    }

    /// Starting snake for a grid: head in the middle, facing right
    pub fn spawn(grid_size: i32) -> Self {
        let mid = grid_size / 2;
        Self::new(Cell::new(mid, mid), Direction::Right, 3)
    }

    pub fn head(&self) -> Cell {
        self.body.front().copied().unwrap_or(Cell::ZERO)
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    /// Self-collision test: the tail is excluded because it vacates this tick
    pub fn bites(&self, cell: Cell) -> bool {
        let n = self.body.len().saturating_sub(1);
        self.body.iter().take(n).any(|c| *c == cell)
    }

    /// Queue a turn. Reversing onto the active direction is rejected.
    pub fn handle_direction_change(&mut self, dir: Direction) -> bool {
        if self.direction.is_opposite(dir) {
            return false;
        }
        self.queued = dir;
        true
    }
}

/// Complete game state (deterministic given the random source)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Current level index (0-based)
    pub level_index: usize,
    pub grid_size: i32,
    pub boundary: BoundaryMode,
    /// Level base interval after difficulty scaling
    pub base_tick_interval_ms: f64,
    pub obstacles_enabled: bool,
    pub gates: FeatureGateSet,
    /// Effects power stars may grant on this level
    pub power_kinds: Vec<EffectKind>,
    pub mode: RunMode,
    pub phase: RunPhase,
    pub snake: Snake,
    /// Primary star (always present)
    pub star: Cell,
    /// The last star respawn found no free cell; retried every tick
    pub star_respawn_pending: bool,
    /// Active entities (sorted by id for determinism)
    pub entities: Vec<Entity>,
    pub effects: StatusEffects,
    pub score: u64,
    /// Currency spent in the shop
    pub stardust: u32,
    /// Combo multiplier (1 = no combo)
    pub combo: u32,
    pub last_eat_at: Option<f64>,
    pub objective: Objective,
    /// Interval the next tick waits for
    pub tick_interval_ms: f64,
    pub last_tick_at: f64,
    /// Rush mode countdown
    pub rush_remaining_ms: f64,
    pub next_meteor_shower_at: f64,
    pub meteor_shower_until: f64,
    pub last_meteor_spawn_at: f64,
    pub next_black_hole_at: f64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub game_over_cause: Option<GameOverCause>,
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Bare state for a level: snake placed, no entities yet
    pub fn blank(grid_size: i32, boundary: BoundaryMode, mode: RunMode) -> Self {
        let snake = Snake::spawn(grid_size);
        let star = snake.head() + Cell::new(3, 0);
        Self {
            level_index: 0,
            grid_size,
            boundary,
            base_tick_interval_ms: 120.0,
            obstacles_enabled: false,
            gates: FeatureGateSet::NONE,
            power_kinds: Vec::new(),
            mode,
            phase: RunPhase::Intro,
            snake,
            star,
            star_respawn_pending: false,
            entities: Vec::new(),
            effects: StatusEffects::new(),
            score: 0,
            stardust: 0,
            combo: 1,
            last_eat_at: None,
            objective: Objective::collect(10),
            tick_interval_ms: 120.0,
            last_tick_at: 0.0,
            rush_remaining_ms: RUSH_DURATION_MS,
            next_meteor_shower_at: 0.0,
            meteor_shower_until: 0.0,
            last_meteor_spawn_at: 0.0,
            next_black_hole_at: 0.0,
            time_ticks: 0,
            game_over_cause: None,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an entity, returning its id
    pub fn add_entity(&mut self, kind: EntityKind) -> u32 {
        let id = self.next_entity_id();
        self.entities.push(Entity::new(id, kind));
        id
    }

    pub fn count_where(&self, pred: impl Fn(&Entity) -> bool) -> usize {
        self.entities.iter().filter(|e| pred(e)).count()
    }

    pub fn obstacle_count(&self) -> usize {
        self.count_where(|e| matches!(e.kind, EntityKind::Asteroid { .. }))
    }

    /// Cells new spawns must avoid
    pub fn reserved_cells(&self, include_star: bool) -> HashSet<Cell> {
        let mut cells: HashSet<Cell> = self.snake.body.iter().copied().collect();
        for entity in &self.entities {
            cells.extend(entity.cells());
        }
        if include_star {
            cells.insert(self.star);
        }
        cells
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.entities.sort_by_key(|e| e.id);
    }

    /// Whether the state accepts ticks
    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn end_run(&mut self, cause: GameOverCause) {
        log::info!("Game over: {} (score {})", cause.message(), self.score);
        self.phase = RunPhase::GameOver;
        self.game_over_cause = Some(cause);
        self.push_event(GameEvent::GameOver {
            cause,
            score: self.score,
        });
    }
}
