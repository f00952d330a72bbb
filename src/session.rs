//! One run of the game
//!
//! The session owns the state, the random source, the player's preferences and
//! records, and the storage they persist to. The host calls `frame` once per
//! display frame and forwards input as `Intent`s.

use crate::highscores::HighScores;
use crate::persistence::KeyValueStore;
use crate::platform;
use crate::settings::Preferences;
use crate::sim::grid::Direction;
use crate::sim::progression::{self, LevelOverrides};
use crate::sim::rng::{EntropySource, RandomSource, SeededSource, daily_seed};
use crate::sim::shop::{self, ShopItem};
use crate::sim::snapshot::Snapshot;
use crate::sim::state::{GameEvent, GameState, RunMode, RunPhase};
use crate::sim::tick;

/// Discrete player input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Turn(Direction),
    TogglePause,
    /// Restart the current level from scratch
    Reset,
    /// Spend a warp charge
    SpecialAction,
    /// Start from the intro, continue after a level, dismiss game over
    Acknowledge,
    NextLevel,
    SelectLevel(usize),
    Purchase(ShopItem),
}

impl Intent {
    /// Parse a host-side input name ("up", "pause", "magnet", ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let intent = match name.to_lowercase().as_str() {
            "up" => Intent::Turn(Direction::Up),
            "down" => Intent::Turn(Direction::Down),
            "left" => Intent::Turn(Direction::Left),
            "right" => Intent::Turn(Direction::Right),
            "pause" => Intent::TogglePause,
            "reset" => Intent::Reset,
            "special" | "warp" => Intent::SpecialAction,
            "ok" | "start" => Intent::Acknowledge,
            "next" => Intent::NextLevel,
            "shield" => Intent::Purchase(ShopItem::Shield),
            "magnet" => Intent::Purchase(ShopItem::Magnet),
            "slowmo" => Intent::Purchase(ShopItem::SlowMo),
            _ => return None,
        };
        Some(intent)
    }
}

pub struct Session {
    state: GameState,
    rng: Box<dyn RandomSource>,
    prefs: Preferences,
    scores: HighScores,
    store: Box<dyn KeyValueStore>,
    /// The current game over has been written to the records
    recorded: bool,
}

fn daily_source() -> SeededSource {
    let today = platform::today();
    SeededSource::new(daily_seed(today.year, today.month, today.day))
}

impl Session {
    /// Session with the random source the preferred mode calls for
    pub fn new(store: Box<dyn KeyValueStore>, now: f64) -> Self {
        let prefs = Preferences::load(store.as_ref());
        let rng: Box<dyn RandomSource> = match prefs.mode {
            RunMode::Daily => Box::new(daily_source()),
            _ => Box::new(EntropySource::new()),
        };
        Self::build(store, prefs, rng, now)
    }

    /// Session with an injected random source (seeded demos and tests)
    pub fn with_random_source(
        store: Box<dyn KeyValueStore>,
        rng: Box<dyn RandomSource>,
        now: f64,
    ) -> Self {
        let prefs = Preferences::load(store.as_ref());
        Self::build(store, prefs, rng, now)
    }

    fn build(
        store: Box<dyn KeyValueStore>,
        prefs: Preferences,
        mut rng: Box<dyn RandomSource>,
        now: f64,
    ) -> Self {
        let scores = HighScores::load(store.as_ref());
        let state = progression::new_run(
            0,
            &prefs.level_overrides(),
            prefs.mode,
            rng.as_mut(),
            now,
        );
        Self {
            state,
            rng,
            prefs,
            scores,
            store,
            recorded: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct access for hosts and tests that script a run
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.scores
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    fn overrides(&self) -> LevelOverrides {
        self.prefs.level_overrides()
    }

    /// Replace the preferences, persist them and restart the run
    pub fn set_preferences(&mut self, prefs: Preferences, now: f64) {
        let mode_changed = prefs.mode != self.prefs.mode;
        self.prefs = prefs;
        if let Err(e) = self.prefs.save(self.store.as_mut()) {
            log::warn!("Failed to save preferences: {}", e);
        }
        if mode_changed && self.prefs.mode != RunMode::Daily {
            self.rng = Box::new(EntropySource::new());
        }
        self.restart(self.state.level_index, now);
    }

    /// Fresh run on `level`, waiting in the intro
    fn restart(&mut self, level: usize, now: f64) {
        if self.prefs.mode == RunMode::Daily {
            self.rng = Box::new(daily_source());
        }
        self.state = progression::new_run(
            level,
            &self.overrides(),
            self.prefs.mode,
            self.rng.as_mut(),
            now,
        );
        self.recorded = false;
    }

    /// Drive one display frame. Ticks at most once, when the effective
    /// interval has elapsed. Returns true if a tick ran.
    pub fn frame(&mut self, now: f64) -> bool {
        if !self.state.is_running() {
            return false;
        }
        if now - self.state.last_tick_at < tick::effective_interval(&self.state, now) {
            return false;
        }
        tick::advance(&mut self.state, self.rng.as_mut(), now);
        if self.scores.raise_best(self.state.score) {
            if let Err(e) = self.scores.save_best(self.store.as_mut()) {
                log::warn!("Failed to save best score: {}", e);
            }
        }
        if self.state.phase == RunPhase::GameOver {
            self.record_game_over();
        }
        true
    }

    fn record_game_over(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        let date = platform::today().iso();
        if let Some(rank) =
            self.scores
                .add_score(self.state.score, self.state.mode, &self.prefs.theme, &date)
        {
            log::info!("New leaderboard entry at rank {}", rank);
        }
        if let Err(e) = self.scores.save(self.store.as_mut()) {
            log::warn!("Failed to save high scores: {}", e);
        }
    }

    fn begin(&mut self, now: f64) {
        self.state.phase = RunPhase::Running;
        self.state.last_tick_at = now;
    }

    /// Apply one input. Returns false if it had no effect.
    pub fn handle_intent(&mut self, intent: Intent, now: f64) -> bool {
        let phase = self.state.phase;
        match intent {
            Intent::Turn(dir) => match phase {
                RunPhase::Intro => {
                    let accepted = self.state.snake.handle_direction_change(dir);
                    self.begin(now);
                    accepted
                }
                RunPhase::Running => self.state.snake.handle_direction_change(dir),
                _ => false,
            },
            Intent::TogglePause => match phase {
                RunPhase::Running => {
                    self.state.phase = RunPhase::Paused;
                    true
                }
                RunPhase::Paused => {
                    self.begin(now);
                    true
                }
                _ => false,
            },
            Intent::Reset => {
                self.restart(self.state.level_index, now);
                true
            }
            Intent::SpecialAction => {
                tick::spend_warp_charge(&mut self.state, self.rng.as_mut(), now)
            }
            Intent::Acknowledge => match phase {
                RunPhase::Intro => {
                    self.begin(now);
                    true
                }
                RunPhase::LevelComplete => self.handle_intent(Intent::NextLevel, now),
                RunPhase::GameOver => {
                    self.restart(self.state.level_index, now);
                    true
                }
                _ => false,
            },
            Intent::NextLevel => {
                if phase != RunPhase::LevelComplete {
                    return false;
                }
                let overrides = self.overrides();
                progression::advance_level(&mut self.state, &overrides, self.rng.as_mut(), now);
                true
            }
            Intent::SelectLevel(level) => {
                self.restart(level, now);
                true
            }
            Intent::Purchase(item) => shop::purchase(&mut self.state, item, now),
        }
    }

    pub fn snapshot(&self, now: f64) -> Snapshot {
        Snapshot::capture(&self.state, self.scores.best, now)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.state.drain_events()
    }
}
