//! Star Snake entry point
//!
//! Native builds play a headless, seeded autopilot run and log how it went.
//! The browser build is driven from JavaScript through `star_snake::web`.

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use star_snake::persistence::MemoryStore;
    use star_snake::sim::{BoundaryMode, Direction, GameState, RunPhase, SeededSource};
    use star_snake::{Intent, Session, in_bounds, manhattan, wrap_cell};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Ten minutes of frames
    const MAX_FRAMES: u32 = 60 * 60 * 10;

    /// Whether stepping in `dir` avoids walls, the body and hazards
    fn is_safe(state: &GameState, dir: Direction) -> bool {
        let mut cell = state.snake.head() + dir.step();
        if !in_bounds(cell, state.grid_size) {
            match state.boundary {
                BoundaryMode::Blocked => return false,
                BoundaryMode::Wrap => cell = wrap_cell(cell, state.grid_size),
                BoundaryMode::Portal => return true,
            }
        }
        !state.snake.bites(cell)
            && !state
                .entities
                .iter()
                .any(|e| e.hazard().is_some() && e.occupies(cell))
    }

    /// Greedy: the safe direction that ends closest to the star
    fn choose(state: &GameState) -> Option<Direction> {
        let current = state.snake.direction;
        let head = state.snake.head();
        Direction::ALL
            .into_iter()
            .filter(|d| !d.is_opposite(current) && is_safe(state, *d))
            .min_by_key(|d| manhattan(head + d.step(), state.star))
    }

    pub fn run(seed: u64) {
        log::info!("Autopilot run with seed {}", seed);
        let mut session = Session::with_random_source(
            Box::new(MemoryStore::new()),
            Box::new(SeededSource::new(seed)),
            0.0,
        );
        session.handle_intent(Intent::Acknowledge, 0.0);

        let mut now = 0.0;
        for _ in 0..MAX_FRAMES {
            now += FRAME_MS;
            match session.state().phase {
                RunPhase::LevelComplete => {
                    session.handle_intent(Intent::NextLevel, now);
                }
                RunPhase::GameOver => break,
                _ => {}
            }

            if let Some(dir) = choose(session.state()) {
                if dir != session.state().snake.queued {
                    session.handle_intent(Intent::Turn(dir), now);
                }
            }
            if session.frame(now) {
                for event in session.drain_events() {
                    log::debug!("{:?}", event);
                }
            }
        }

        let state = session.state();
        log::info!(
            "Reached level {} with score {} ({} stardust) after {} ticks",
            state.level_index + 1,
            state.score,
            state.stardust,
            state.time_ticks
        );
        if let Some(cause) = state.game_over_cause {
            log::info!("{}", cause.message());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Star Snake (native) starting...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2024);
    autopilot::run(seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is star_snake::web::start, this is just to satisfy the compiler
}
