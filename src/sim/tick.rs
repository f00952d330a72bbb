//! Simulation tick
//!
//! One call to `advance` moves the snake a single cell and resolves
//! everything that follows from it: boundary, nudges, collisions, teleports,
//! collection, growth, speed and hazard scheduling.

use super::effects::{EffectKind, Protection};
use super::entity::{Contact, ContactOutcome, EntityKind, HazardClass, TeleportTarget};
use super::grid::{BoundaryMode, Direction};
use super::rng::RandomSource;
use super::spawner;
use super::state::{GameEvent, GameOverCause, GameState, RunMode, RunPhase};
use crate::consts::*;
use crate::{Cell, in_bounds, manhattan, wrap_cell};

/// Where the head goes after the boundary policy
enum Move {
    To { cell: Cell, relocated: bool },
    /// Protected against a blocked wall: stay put this tick
    Hold,
    Dead,
}

/// Score-driven interval before any effect or field
pub fn score_tick_interval(base_ms: f64, score: u64) -> f64 {
    let ramp = (score as f64 * SPEED_RAMP_PER_POINT_MS).min(MAX_SPEED_RAMP_MS);
    (base_ms - ramp).max(MIN_TICK_INTERVAL_MS)
}

/// Interval for the next tick: score ramp, speed boost, or a time field under
/// the head which overrides both
pub fn tick_interval(state: &GameState, now: f64) -> f64 {
    let head = state.snake.head();
    let field = state.entities.iter().find_map(|e| match e.kind {
        EntityKind::TimeField { area, factor } if area.contains(head) => Some(factor),
        _ => None,
    });
    if let Some(factor) = field {
        return (state.base_tick_interval_ms * factor).max(MIN_TIME_FIELD_INTERVAL_MS);
    }

    let interval = score_tick_interval(state.base_tick_interval_ms, state.score);
    if state.effects.is_active(EffectKind::SpeedBoost, now) {
        interval * SPEED_BOOST_FACTOR
    } else {
        interval
    }
}

/// Wall-clock time the host waits between ticks. Slow-mo stretches it.
pub fn effective_interval(state: &GameState, now: f64) -> f64 {
    if state.effects.is_active(EffectKind::SlowMo, now) {
        state.tick_interval_ms * SLOWMO_FACTOR
    } else {
        state.tick_interval_ms
    }
}

/// Advance the game state by one tick
pub fn advance(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) {
    if !state.is_running() {
        return;
    }
    let elapsed = effective_interval(state, now);
    state.last_tick_at = now;
    state.time_ticks += 1;

    state.snake.direction = state.snake.queued;
    if !move_snake(state, rng, now) {
        return;
    }
    if state.phase != RunPhase::Running {
        state.normalize_order();
        return;
    }

    state.tick_interval_ms = tick_interval(state, now);
    schedule_hazards(state, rng, now);

    if state.mode == RunMode::Rush {
        state.rush_remaining_ms = (state.rush_remaining_ms - elapsed).max(0.0);
        if state.rush_remaining_ms <= 0.0 {
            state.end_run(GameOverCause::TimeUp);
        }
    }

    state.normalize_order();
}

/// Movement through growth. Returns false if the run ended.
fn move_snake(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    let prev_head = state.snake.head();
    let candidate = prev_head + state.snake.direction.step();

    let mut head = match resolve_boundary(state, rng, prev_head, candidate, now) {
        Move::To {
            cell,
            relocated: false,
        } => nudge(state, rng, prev_head, cell),
        Move::To { cell, .. } => cell,
        Move::Hold => return true,
        Move::Dead => return false,
    };

    if hazard_at(state, head, HazardClass::Static) && !survive(state, GameOverCause::Obstacle, now)
    {
        return false;
    }
    if !state.effects.is_active(EffectKind::Phase, now)
        && state.snake.bites(head)
        && !survive(state, GameOverCause::SelfBite, now)
    {
        return false;
    }
    if hazard_at(state, head, HazardClass::Moving) && !survive(state, GameOverCause::Meteor, now)
    {
        return false;
    }

    head = teleport(state, rng, head, now);
    state.snake.body.push_front(head);

    if state.effects.is_active(EffectKind::Drone, now) {
        if let Some(target) = drone_target(state, head, now) {
            log::debug!("Drone snapped head {} -> {}", head, target);
            head = target;
            if let Some(front) = state.snake.body.front_mut() {
                *front = target;
            }
        }
    }

    let mut grew = false;
    let mut star_eaten = false;
    if !state.star_respawn_pending && head == state.star {
        eat_star(state, now);
        grew = true;
        star_eaten = true;
    }

    let contact = Contact {
        cell: head,
        prev_head,
        now,
    };
    let mut outcomes = Vec::new();
    for entity in &mut state.entities {
        if entity.is_collectible() && entity.occupies(head) {
            let outcome = entity.on_contact(&contact);
            if outcome.removes() {
                outcomes.push((entity.id, entity.name(), outcome));
            }
        }
    }
    state
        .entities
        .retain(|e| !outcomes.iter().any(|(id, _, _)| *id == e.id));
    for (_, kind, outcome) in outcomes {
        grew |= apply_outcome(state, rng, kind, outcome, head, now);
    }

    if !grew {
        state.snake.body.pop_back();
    }

    if star_eaten {
        spawner::respawn_star(state, rng);
        if state.gates.bonus_star && rng.chance(BONUS_STAR_CHANCE) {
            spawner::spawn_bonus_star(state, rng, now);
        }
    }
    true
}

fn resolve_boundary(
    state: &mut GameState,
    rng: &mut dyn RandomSource,
    prev_head: Cell,
    candidate: Cell,
    now: f64,
) -> Move {
    if in_bounds(candidate, state.grid_size) {
        return Move::To {
            cell: candidate,
            relocated: false,
        };
    }
    match state.boundary {
        BoundaryMode::Wrap => Move::To {
            cell: wrap_cell(candidate, state.grid_size),
            relocated: false,
        },
        BoundaryMode::Portal => match spawner::safe_cell(state, rng) {
            Some(cell) => {
                state.effects.grant_grace(now, PORTAL_GRACE_MS);
                state.push_event(GameEvent::Warped {
                    from: prev_head,
                    to: cell,
                });
                Move::To {
                    cell,
                    relocated: true,
                }
            }
            None => {
                log::debug!("Portal found no safe cell, wrapping instead");
                Move::To {
                    cell: wrap_cell(candidate, state.grid_size),
                    relocated: false,
                }
            }
        },
        BoundaryMode::Blocked => {
            if survive(state, GameOverCause::Wall, now) {
                Move::Hold
            } else {
                Move::Dead
            }
        }
    }
}

/// Gravity wells and wind bands may deflect the step sideways. The first one
/// that fires wins.
fn nudge(state: &GameState, rng: &mut dyn RandomSource, prev_head: Cell, head: Cell) -> Cell {
    let dir = state.snake.direction;
    for entity in &state.entities {
        let push = match entity.kind {
            EntityKind::Planet { cell, radius } if manhattan(head, cell) <= radius * 3 => {
                if !rng.chance(GRAVITY_PULL_CHANCE) {
                    continue;
                }
                let delta = cell - head;
                let toward = if dir.is_horizontal() {
                    Cell::new(0, delta.y.signum())
                } else {
                    Cell::new(delta.x.signum(), 0)
                };
                Direction::from_step(toward)
            }
            EntityKind::SolarWind { push, .. } if entity.occupies(head) => {
                if push.is_horizontal() == dir.is_horizontal() || !rng.chance(WIND_PUSH_CHANCE) {
                    continue;
                }
                Some(push)
            }
            _ => None,
        };
        if let Some(cell) = push.and_then(|p| deflect(state, prev_head, p)) {
            return cell;
        }
    }
    head
}

/// The cell beside `prev_head` in direction `push`, unless it is the neck or
/// lies past a non-wrapping edge
fn deflect(state: &GameState, prev_head: Cell, push: Direction) -> Option<Cell> {
    let mut cell = prev_head + push.step();
    if !in_bounds(cell, state.grid_size) {
        if state.boundary != BoundaryMode::Wrap {
            return None;
        }
        cell = wrap_cell(cell, state.grid_size);
    }
    let neck = state.snake.body.get(1).copied();
    (Some(cell) != neck).then_some(cell)
}

fn hazard_at(state: &GameState, cell: Cell, class: HazardClass) -> bool {
    state
        .entities
        .iter()
        .any(|e| e.hazard() == Some(class) && e.occupies(cell))
}

/// Resolve a lethal contact. Grace passes through, a shield is spent,
/// otherwise the run ends.
fn survive(state: &mut GameState, cause: GameOverCause, now: f64) -> bool {
    match state.effects.protection(now) {
        Some(Protection::Grace) => true,
        Some(Protection::Shield) => {
            state.effects.consume(EffectKind::Shield, now);
            log::debug!("Shield absorbed {:?}", cause);
            state.push_event(GameEvent::ShieldBroken);
            true
        }
        None => {
            state.end_run(cause);
            false
        }
    }
}

/// Apply at most one teleport at `head`, lowest class first
fn teleport(state: &mut GameState, rng: &mut dyn RandomSource, head: Cell, now: f64) -> Cell {
    let Some(tp) = state
        .entities
        .iter()
        .filter_map(|e| e.teleport_at(head))
        .min_by_key(|t| t.class)
    else {
        return head;
    };

    let target = match tp.target {
        TeleportTarget::Cell(cell) => cell,
        TeleportTarget::RandomSafeCell => match spawner::safe_cell(state, rng) {
            Some(cell) => cell,
            None => return head,
        },
    };
    if tp.grace_ms > 0.0 {
        state.effects.grant_grace(now, tp.grace_ms);
    }
    log::debug!("{:?} {} -> {}", tp.class, head, target);
    state.push_event(GameEvent::Warped {
        from: head,
        to: target,
    });
    target
}

/// Nearest collectible cell within drone reach; the first found wins ties.
/// None when the head already sits on a collectible. Cells under the body or
/// a hazard are never targets.
fn drone_target(state: &GameState, head: Cell, now: f64) -> Option<Cell> {
    let star = (!state.star_respawn_pending).then_some(state.star);
    let candidates = star
        .into_iter()
        .chain(state.entities.iter().flat_map(|e| e.collectible_cells(now)));
    let blocked = |cell: Cell| {
        state.snake.body.iter().skip(1).any(|c| *c == cell)
            || state
                .entities
                .iter()
                .any(|e| e.hazard().is_some() && e.occupies(cell))
    };

    let mut best: Option<(i32, Cell)> = None;
    for cell in candidates {
        let d = manhattan(cell, head);
        if d == 0 {
            return None;
        }
        if d <= DRONE_REACH && best.is_none_or(|(bd, _)| d < bd) && !blocked(cell) {
            best = Some((d, cell));
        }
    }
    best.map(|(_, cell)| cell)
}

fn score_multiplier(state: &GameState, now: f64) -> u64 {
    if state.effects.is_active(EffectKind::DoubleScore, now) {
        2
    } else {
        1
    }
}

fn eat_star(state: &mut GameState, now: f64) {
    state.combo = match state.last_eat_at {
        Some(t) if now - t <= COMBO_WINDOW_MS => (state.combo + 1).min(MAX_COMBO),
        _ => 1,
    };
    state.last_eat_at = Some(now);
    if state.combo > 1 {
        state.push_event(GameEvent::ComboUp {
            multiplier: state.combo,
        });
    }

    let points = score_multiplier(state, now) + u64::from(state.combo - 1);
    state.score += points;
    state.stardust += 1;
    state.objective.progress += 1;
    state.push_event(GameEvent::StarEaten {
        cell: state.star,
        points,
    });

    if state.objective.is_complete() {
        log::info!(
            "Level {} complete with score {}",
            state.level_index + 1,
            state.score
        );
        state.phase = RunPhase::LevelComplete;
        state.push_event(GameEvent::LevelComplete {
            level: state.level_index,
        });
    }
}

/// Apply a collectible outcome. Returns true if it scored (the snake grows).
fn apply_outcome(
    state: &mut GameState,
    rng: &mut dyn RandomSource,
    kind: &'static str,
    outcome: ContactOutcome,
    cell: Cell,
    now: f64,
) -> bool {
    let points = outcome.points() * score_multiplier(state, now);
    if points > 0 {
        state.score += points;
        state.push_event(GameEvent::Collected { kind, cell, points });
    }

    match outcome {
        ContactOutcome::Award {
            stardust_chance, ..
        } => {
            if stardust_chance > 0.0 && rng.chance(stardust_chance) {
                state.stardust += 1;
            }
        }
        ContactOutcome::Nova { center, .. } => {
            let count = spawner::clear_hazards_near(state, center, NOVA_CLEAR_RADIUS);
            if count > 0 {
                state.push_event(GameEvent::ObstaclesCleared { count });
            }
        }
        ContactOutcome::Constellation { .. } => {
            log::info!("Constellation complete");
            state.push_event(GameEvent::Celebration { cell });
        }
        ContactOutcome::Comet { .. } => {
            state.effects.grant_grace(now, COMET_GRACE_MS);
        }
        ContactOutcome::Grant(effect) => {
            state.effects.grant(effect, effect.power_grant(), now);
            log::debug!("Granted {:?}", effect);
            state.push_event(GameEvent::EffectGranted { effect });
        }
        ContactOutcome::Nothing | ContactOutcome::Progress | ContactOutcome::Fizzle => {}
    }
    points > 0
}

fn count_named(state: &GameState, name: &str) -> usize {
    state.count_where(|e| e.name() == name)
}

/// Obstacle growth, timed hazards, feature spawns, motion, magnet and expiry
fn schedule_hazards(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) {
    let gates = state.gates;

    if state.obstacles_enabled {
        let desired = spawner::desired_obstacle_count(state.score);
        spawner::grow_obstacles(state, rng, desired);
    }

    if gates.meteors {
        if now >= state.next_meteor_shower_at && now >= state.meteor_shower_until {
            state.meteor_shower_until = now + METEOR_SHOWER_DURATION_MS;
            state.next_meteor_shower_at =
                now + METEOR_COOLDOWN_MS + rng.jitter(METEOR_COOLDOWN_JITTER_MS);
            log::debug!("Meteor shower until {}", state.meteor_shower_until);
            state.push_event(GameEvent::MeteorShower);
        }
        if now < state.meteor_shower_until
            && now - state.last_meteor_spawn_at >= METEOR_SPAWN_INTERVAL_MS
        {
            spawner::spawn_meteor(state, rng);
            state.last_meteor_spawn_at = now;
        }
    }

    if gates.black_holes && now >= state.next_black_hole_at {
        if count_named(state, "black_hole") < MAX_BLACK_HOLES {
            spawner::spawn_black_hole(state, rng, now);
        }
        state.next_black_hole_at =
            now + BLACK_HOLE_COOLDOWN_MS + rng.jitter(BLACK_HOLE_COOLDOWN_JITTER_MS);
    }

    if gates.comet && count_named(state, "comet") == 0 && rng.chance(COMET_CHANCE) {
        spawner::spawn_comet(state, rng, now);
    }

    if gates.extra_stars
        && count_named(state, "extra_star") < MAX_EXTRA_STARS
        && rng.chance(EXTRA_STAR_CHANCE)
    {
        spawner::spawn_extra_star(state, rng);
    }
    if gates.wide_star && count_named(state, "wide_star") == 0 && rng.chance(WIDE_STAR_CHANCE) {
        spawner::spawn_wide_star(state, rng, now);
    }
    if gates.blink_star && count_named(state, "blink_star") == 0 && rng.chance(BLINK_STAR_CHANCE)
    {
        spawner::spawn_blink_star(state, rng, now);
    }
    if gates.ring_star && count_named(state, "ring_star") == 0 && rng.chance(RING_STAR_CHANCE) {
        spawner::spawn_ring_star(state, rng, now);
    }
    if gates.nova_core && count_named(state, "nova_core") == 0 && rng.chance(NOVA_CORE_CHANCE) {
        spawner::spawn_nova_core(state, rng, now);
    }
    if gates.quantum_pair
        && count_named(state, "quantum_pair") == 0
        && rng.chance(QUANTUM_PAIR_CHANCE)
    {
        spawner::spawn_quantum_pair(state, rng, now);
    }
    if gates.constellation
        && count_named(state, "constellation") == 0
        && rng.chance(CONSTELLATION_CHANCE)
    {
        spawner::spawn_constellation(state, rng, now);
    }
    if gates.power_stars
        && count_named(state, "power_star") < MAX_POWER_STARS
        && rng.chance(POWER_STAR_CHANCE)
    {
        spawner::spawn_power_star(state, rng, now);
    }

    if !state.effects.is_active(EffectKind::Stasis, now) {
        let grid_size = state.grid_size;
        let wrap = state.boundary != BoundaryMode::Blocked;
        state
            .entities
            .retain_mut(|e| e.advance_motion(now, grid_size, wrap));
    }

    if state.effects.is_active(EffectKind::Magnet, now) {
        apply_magnet(state);
    }

    let before = state.entities.len();
    state.entities.retain(|e| !e.is_expired(now));
    if state.entities.len() < before {
        log::debug!("{} entities expired", before - state.entities.len());
    }

    if state.star_respawn_pending {
        spawner::respawn_star(state, rng);
    }
    state.effects.prune(now);
}

/// One cell from `cell` toward `head`, along the longer axis
fn magnet_step(cell: Cell, head: Cell) -> Option<Cell> {
    let d = manhattan(cell, head);
    if d == 0 || d > MAGNET_REACH {
        return None;
    }
    let delta = head - cell;
    let step = if delta.x.abs() >= delta.y.abs() {
        Cell::new(delta.x.signum(), 0)
    } else {
        Cell::new(0, delta.y.signum())
    };
    Some(cell + step)
}

/// Pull the primary star and simple stars one cell toward the head
fn apply_magnet(state: &mut GameState) {
    let head = state.snake.head();
    let mut blocked = state.reserved_cells(true);

    if !state.star_respawn_pending {
        if let Some(next) = magnet_step(state.star, head).filter(|c| !blocked.contains(c)) {
            blocked.remove(&state.star);
            blocked.insert(next);
            state.star = next;
        }
    }

    for entity in &mut state.entities {
        if let EntityKind::ExtraStar { cell }
        | EntityKind::BonusStar { cell, .. }
        | EntityKind::RingStar { cell, .. } = &mut entity.kind
        {
            let current = *cell;
            if let Some(next) = magnet_step(current, head).filter(|c| !blocked.contains(c)) {
                blocked.remove(&current);
                blocked.insert(next);
                *cell = next;
            }
        }
    }
}

/// Spend a warp charge: jump the head to a safe cell with a short grace.
/// Returns false if no charge or no safe cell was available.
pub fn spend_warp_charge(state: &mut GameState, rng: &mut dyn RandomSource, now: f64) -> bool {
    if !state.is_running() || state.effects.charges(EffectKind::Warp) == 0 {
        return false;
    }
    let Some(target) = spawner::safe_cell(state, rng) else {
        return false;
    };
    state.effects.consume(EffectKind::Warp, now);

    let from = state.snake.head();
    state.snake.body.push_front(target);
    state.snake.body.pop_back();
    state.effects.grant_grace(now, WARP_GATE_GRACE_MS);
    state.push_event(GameEvent::Warped { from, to: target });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::effects::Grant;
    use crate::sim::grid::Rect;
    use crate::sim::level::LEVELS;
    use crate::sim::progression::{LevelOverrides, new_run};
    use crate::sim::rng::SeededSource;
    use crate::sim::state::{Objective, Snake};

    fn running_state(boundary: BoundaryMode) -> GameState {
        let mut state = GameState::blank(16, boundary, RunMode::Classic);
        state.snake = Snake::new(Cell::new(10, 10), Direction::Right, 3);
        state.star = Cell::new(0, 0);
        state.objective = Objective::collect(10);
        state.phase = RunPhase::Running;
        state
    }

    fn body(state: &GameState) -> Vec<Cell> {
        state.snake.body.iter().copied().collect()
    }

    #[test]
    fn test_step_drops_tail() {
        let mut rng = SeededSource::new(1);
        let mut state = running_state(BoundaryMode::Blocked);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(
            body(&state),
            vec![Cell::new(11, 10), Cell::new(10, 10), Cell::new(9, 10)]
        );
        assert_eq!(state.phase, RunPhase::Running);
    }

    #[test]
    fn test_wrap_right_edge() {
        let mut rng = SeededSource::new(2);
        let mut state = running_state(BoundaryMode::Wrap);
        state.snake = Snake::new(Cell::new(15, 10), Direction::Right, 3);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(0, 10));
    }

    #[test]
    fn test_eating_star() {
        let mut rng = SeededSource::new(3);
        let mut state = running_state(BoundaryMode::Blocked);
        state.star = Cell::new(11, 10);
        advance(&mut state, &mut rng, 0.0);
        assert!(state.score >= 1);
        assert_eq!(state.objective.progress, 1);
        assert_eq!(state.stardust, 1);
        assert_eq!(state.snake.len(), 4);
        assert!(!state.snake.contains(state.star));
    }

    #[test]
    fn test_objective_completes_level() {
        let mut rng = SeededSource::new(4);
        let mut state = running_state(BoundaryMode::Blocked);
        state.objective = Objective::collect(1);
        state.star = Cell::new(11, 10);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.phase, RunPhase::LevelComplete);
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::LevelComplete { level: 0 })
        );

        // No further ticks until the next level is armed
        let head = state.snake.head();
        advance(&mut state, &mut rng, 500.0);
        assert_eq!(state.snake.head(), head);
    }

    #[test]
    fn test_shield_absorbs_once() {
        let mut rng = SeededSource::new(5);
        let mut state = running_state(BoundaryMode::Blocked);
        state.effects.grant(EffectKind::Shield, Grant::Arm, 0.0);
        state.add_entity(EntityKind::Asteroid {
            cell: Cell::new(11, 10),
        });

        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.phase, RunPhase::Running);
        assert!(!state.effects.is_active(EffectKind::Shield, 0.0));
        assert!(state.effects.in_grace(0.0));

        // Inside the grace window
        state.add_entity(EntityKind::Asteroid {
            cell: Cell::new(12, 10),
        });
        advance(&mut state, &mut rng, 120.0);
        assert_eq!(state.phase, RunPhase::Running);

        // Grace over
        state.add_entity(EntityKind::Asteroid {
            cell: Cell::new(13, 10),
        });
        advance(&mut state, &mut rng, SHIELD_BREAK_GRACE_MS + 200.0);
        assert_eq!(state.phase, RunPhase::GameOver);
        assert_eq!(state.game_over_cause, Some(GameOverCause::Obstacle));
    }

    #[test]
    fn test_reverse_turn_ignored() {
        let mut rng = SeededSource::new(6);
        let mut state = running_state(BoundaryMode::Blocked);
        state.snake.handle_direction_change(Direction::Left);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.direction, Direction::Right);
        assert_eq!(state.snake.head(), Cell::new(11, 10));
    }

    #[test]
    fn test_blocked_wall_is_lethal() {
        let mut rng = SeededSource::new(7);
        let mut state = running_state(BoundaryMode::Blocked);
        state.snake = Snake::new(Cell::new(15, 10), Direction::Right, 3);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.phase, RunPhase::GameOver);
        assert_eq!(state.game_over_cause, Some(GameOverCause::Wall));
    }

    #[test]
    fn test_shielded_wall_holds_position() {
        let mut rng = SeededSource::new(8);
        let mut state = running_state(BoundaryMode::Blocked);
        state.snake = Snake::new(Cell::new(15, 10), Direction::Right, 3);
        state.effects.grant(EffectKind::Shield, Grant::Arm, 0.0);
        let before = body(&state);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.phase, RunPhase::Running);
        assert_eq!(body(&state), before);
        assert!(!state.effects.is_active(EffectKind::Shield, 0.0));
    }

    #[test]
    fn test_portal_relocates_with_grace() {
        let mut rng = SeededSource::new(9);
        let mut state = running_state(BoundaryMode::Portal);
        state.snake = Snake::new(Cell::new(15, 10), Direction::Right, 3);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.phase, RunPhase::Running);
        assert!(in_bounds(state.snake.head(), 16));
        assert!(state.effects.in_grace(PORTAL_GRACE_MS - 1.0));
    }

    #[test]
    fn test_self_bite_and_phase() {
        let curled = [
            Cell::new(5, 5),
            Cell::new(6, 5),
            Cell::new(6, 6),
            Cell::new(5, 6),
            Cell::new(4, 6),
        ];
        let mut rng = SeededSource::new(10);

        let mut state = running_state(BoundaryMode::Wrap);
        state.snake.body = curled.iter().copied().collect();
        state.snake.direction = Direction::Down;
        state.snake.queued = Direction::Down;
        let mut phased = state.clone();

        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.game_over_cause, Some(GameOverCause::SelfBite));

        phased.effects.grant(EffectKind::Phase, Grant::Duration(5000.0), 0.0);
        advance(&mut phased, &mut rng, 0.0);
        assert_eq!(phased.phase, RunPhase::Running);
        assert_eq!(phased.snake.head(), Cell::new(5, 6));
    }

    #[test]
    fn test_meteor_is_lethal() {
        let mut rng = SeededSource::new(11);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::Meteor {
            cell: Cell::new(11, 10),
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.game_over_cause, Some(GameOverCause::Meteor));
    }

    #[test]
    fn test_quantum_pair_award() {
        let mut rng = SeededSource::new(12);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::QuantumPair {
            a: Cell::new(11, 10),
            b: Cell::new(13, 10),
            armed: None,
            expires_at: 15_000.0,
        });
        advance(&mut state, &mut rng, 0.0);
        advance(&mut state, &mut rng, 120.0);
        advance(&mut state, &mut rng, 240.0);
        assert_eq!(state.score, QUANTUM_PAIR_POINTS);
        assert_eq!(count_named(&state, "quantum_pair"), 0);
        assert_eq!(state.snake.len(), 4);
    }

    #[test]
    fn test_quantum_pair_window_lapses() {
        let mut rng = SeededSource::new(13);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::QuantumPair {
            a: Cell::new(11, 10),
            b: Cell::new(3, 3),
            armed: None,
            expires_at: 15_000.0,
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(count_named(&state, "quantum_pair"), 1);
        advance(&mut state, &mut rng, QUANTUM_WINDOW_MS + 100.0);
        assert_eq!(count_named(&state, "quantum_pair"), 0);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_combo_and_double_score() {
        let mut rng = SeededSource::new(14);
        let mut state = running_state(BoundaryMode::Wrap);
        state.star = Cell::new(11, 10);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.score, 1);

        state.star = Cell::new(12, 10);
        state.effects.grant(EffectKind::DoubleScore, Grant::Duration(8000.0), 100.0);
        advance(&mut state, &mut rng, 120.0);
        // 1 x 2 plus one combo bonus point
        assert_eq!(state.combo, 2);
        assert_eq!(state.score, 1 + 3);
    }

    #[test]
    fn test_power_star_grants_without_growth() {
        let mut rng = SeededSource::new(15);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::PowerStar {
            cell: Cell::new(11, 10),
            effect: EffectKind::Magnet,
            expires_at: 10_000.0,
        });
        advance(&mut state, &mut rng, 0.0);
        assert!(state.effects.is_active(EffectKind::Magnet, 0.0));
        assert_eq!(state.snake.len(), 3);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_nova_clears_nearby_asteroids() {
        let mut rng = SeededSource::new(16);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::NovaCore {
            cell: Cell::new(11, 10),
            expires_at: 10_000.0,
        });
        state.add_entity(EntityKind::Asteroid {
            cell: Cell::new(12, 11),
        });
        state.add_entity(EntityKind::Asteroid {
            cell: Cell::new(2, 2),
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.score, NOVA_CORE_POINTS);
        assert_eq!(state.obstacle_count(), 1);
    }

    #[test]
    fn test_warp_gate_teleports() {
        let mut rng = SeededSource::new(17);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::WarpGate {
            a: Cell::new(11, 10),
            b: Cell::new(3, 3),
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(3, 3));
        assert!(state.effects.in_grace(WARP_GATE_GRACE_MS - 1.0));
        assert!(state.drain_events().contains(&GameEvent::Warped {
            from: Cell::new(11, 10),
            to: Cell::new(3, 3)
        }));
    }

    #[test]
    fn test_black_hole_relocates() {
        let mut rng = SeededSource::new(18);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::BlackHole {
            cell: Cell::new(11, 10),
            expires_at: 10_000.0,
        });
        advance(&mut state, &mut rng, 0.0);
        assert_ne!(state.snake.head(), Cell::new(11, 10));
        assert!(state.effects.in_grace(BLACK_HOLE_GRACE_MS - 1.0));
    }

    #[test]
    fn test_drone_snaps_to_star() {
        let mut rng = SeededSource::new(19);
        let mut state = running_state(BoundaryMode::Wrap);
        state.star = Cell::new(12, 11);
        state.effects.grant(EffectKind::Drone, Grant::Duration(6000.0), 0.0);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(12, 11));
        assert_eq!(state.objective.progress, 1);
    }

    #[test]
    fn test_magnet_pulls_star() {
        let mut rng = SeededSource::new(20);
        let mut state = running_state(BoundaryMode::Wrap);
        state.star = Cell::new(11, 14);
        state.effects.grant(EffectKind::Magnet, Grant::Duration(8000.0), 0.0);
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.star, Cell::new(11, 13));
    }

    #[test]
    fn test_speed_formula() {
        assert_eq!(score_tick_interval(130.0, 0), 130.0);
        assert_eq!(score_tick_interval(130.0, 20), 100.0);
        assert_eq!(score_tick_interval(130.0, 1000), MIN_TICK_INTERVAL_MS);
    }

    #[test]
    fn test_time_field_overrides_interval() {
        let mut rng = SeededSource::new(21);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::TimeField {
            area: Rect::new(Cell::new(11, 9), Cell::new(13, 11)),
            factor: 0.3,
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.tick_interval_ms, MIN_TIME_FIELD_INTERVAL_MS);
    }

    #[test]
    fn test_slowmo_doubles_effective_interval() {
        let mut state = running_state(BoundaryMode::Wrap);
        state.tick_interval_ms = 100.0;
        assert_eq!(effective_interval(&state, 0.0), 100.0);
        state.effects.grant(EffectKind::SlowMo, Grant::Duration(6000.0), 0.0);
        assert_eq!(effective_interval(&state, 0.0), 200.0);
    }

    #[test]
    fn test_rush_timer_ends_run() {
        let mut rng = SeededSource::new(22);
        let mut state = running_state(BoundaryMode::Wrap);
        state.mode = RunMode::Rush;
        state.rush_remaining_ms = 100.0;
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.game_over_cause, Some(GameOverCause::TimeUp));
        assert_eq!(state.rush_remaining_ms, 0.0);
    }

    #[test]
    fn test_warp_charge() {
        let mut rng = SeededSource::new(23);
        let mut state = running_state(BoundaryMode::Wrap);
        assert!(!spend_warp_charge(&mut state, &mut rng, 0.0));
        state.effects.grant(EffectKind::Warp, Grant::Charges(1), 0.0);
        assert!(spend_warp_charge(&mut state, &mut rng, 0.0));
        assert_eq!(state.effects.charges(EffectKind::Warp), 0);
        assert_eq!(state.snake.len(), 3);
        assert!(state.effects.in_grace(1.0));
    }

    #[test]
    fn test_determinism() {
        let overrides = LevelOverrides::default();
        let level = LEVELS.len() - 2;
        let mut rng1 = SeededSource::new(99_999);
        let mut rng2 = SeededSource::new(99_999);
        let mut state1 = new_run(level, &overrides, RunMode::Classic, &mut rng1, 0.0);
        let mut state2 = new_run(level, &overrides, RunMode::Classic, &mut rng2, 0.0);
        state1.phase = RunPhase::Running;
        state2.phase = RunPhase::Running;

        let turns = [Direction::Down, Direction::Left, Direction::Up, Direction::Right];
        let mut now = 0.0;
        for i in 0..300 {
            now += 110.0;
            let dir = turns[(i / 7) % turns.len()];
            state1.snake.handle_direction_change(dir);
            state2.snake.handle_direction_change(dir);
            advance(&mut state1, &mut rng1, now);
            advance(&mut state2, &mut rng2, now);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(
            serde_json::to_string(&state1).unwrap(),
            serde_json::to_string(&state2).unwrap()
        );
    }

    /// Every chance roll succeeds
    struct AlwaysFires;

    impl RandomSource for AlwaysFires {
        fn next_f64(&mut self) -> f64 {
            0.0
        }
    }

    fn meteor_count(state: &GameState) -> usize {
        state.count_where(|e| matches!(e.kind, EntityKind::Meteor { .. }))
    }

    fn black_hole_count(state: &GameState) -> usize {
        state.count_where(|e| matches!(e.kind, EntityKind::BlackHole { .. }))
    }

    #[test]
    fn test_drone_collects_star_under_head() {
        let mut rng = SeededSource::new(31);
        let mut state = running_state(BoundaryMode::Wrap);
        state.star = Cell::new(11, 10);
        state.add_entity(EntityKind::ExtraStar {
            cell: Cell::new(12, 10),
        });
        state.effects.grant(EffectKind::Drone, Grant::Duration(6000.0), 0.0);
        advance(&mut state, &mut rng, 0.0);

        assert_eq!(state.snake.head(), Cell::new(11, 10));
        assert_eq!(state.objective.progress, 1);
        assert_eq!(
            state.count_where(|e| matches!(e.kind, EntityKind::ExtraStar { .. })),
            1
        );
    }

    #[test]
    fn test_drone_ignores_blocked_cells() {
        let mut rng = SeededSource::new(32);
        let mut state = running_state(BoundaryMode::Wrap);
        // A comet drifting over an asteroid and a star lying on the body
        state.add_entity(EntityKind::Asteroid {
            cell: Cell::new(12, 10),
        });
        state.add_entity(EntityKind::Comet {
            cell: Cell::new(12, 10),
            velocity: Cell::new(0, 1),
            expires_at: 8000.0,
            last_move_at: 0.0,
        });
        state.add_entity(EntityKind::ExtraStar {
            cell: Cell::new(10, 10),
        });
        state.effects.grant(EffectKind::Drone, Grant::Duration(6000.0), 0.0);
        advance(&mut state, &mut rng, 0.0);

        assert_eq!(state.phase, RunPhase::Running);
        assert_eq!(state.snake.head(), Cell::new(11, 10));
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_gravity_well_deflects_step() {
        let mut rng = AlwaysFires;
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::Planet {
            cell: Cell::new(11, 8),
            radius: 1,
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(10, 9));
        assert_eq!(state.snake.body[1], Cell::new(10, 10));
    }

    #[test]
    fn test_gravity_well_out_of_reach() {
        let mut rng = AlwaysFires;
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::Planet {
            cell: Cell::new(11, 4),
            radius: 1,
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(11, 10));
    }

    #[test]
    fn test_solar_wind_pushes_across_heading() {
        let mut rng = AlwaysFires;
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::SolarWind {
            top: 9,
            bottom: 11,
            push: Direction::Down,
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(10, 11));

        // Wind along the heading never deflects
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::SolarWind {
            top: 9,
            bottom: 11,
            push: Direction::Right,
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(11, 10));
    }

    #[test]
    fn test_one_way_gate_relocates_without_grace() {
        let mut rng = SeededSource::new(33);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::OneWayGate {
            from: Cell::new(11, 10),
            to: Cell::new(4, 4),
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(4, 4));
        assert!(!state.effects.in_grace(0.0));
        assert!(state.drain_events().contains(&GameEvent::Warped {
            from: Cell::new(11, 10),
            to: Cell::new(4, 4)
        }));

        // The exit does not lead back
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::OneWayGate {
            from: Cell::new(4, 4),
            to: Cell::new(11, 10),
        });
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.snake.head(), Cell::new(11, 10));
    }

    #[test]
    fn test_meteor_shower_schedule() {
        let mut rng = SeededSource::new(34);
        let mut state = running_state(BoundaryMode::Wrap);
        state.gates.meteors = true;
        state.next_meteor_shower_at = 1000.0;

        advance(&mut state, &mut rng, 0.0);
        assert_eq!(meteor_count(&state), 0);

        advance(&mut state, &mut rng, 1000.0);
        assert!(state.drain_events().contains(&GameEvent::MeteorShower));
        assert_eq!(state.meteor_shower_until, 1000.0 + METEOR_SHOWER_DURATION_MS);
        let cooldown = state.next_meteor_shower_at - 1000.0;
        assert!(cooldown >= METEOR_COOLDOWN_MS);
        assert!(cooldown < METEOR_COOLDOWN_MS + METEOR_COOLDOWN_JITTER_MS);
        assert_eq!(meteor_count(&state), 1);

        // One meteor per spawn interval
        advance(&mut state, &mut rng, 1100.0);
        assert_eq!(meteor_count(&state), 1);
        advance(&mut state, &mut rng, 1200.0);
        assert_eq!(meteor_count(&state), 2);
        assert_eq!(state.last_meteor_spawn_at, 1200.0);

        // Shower over, cooldown running
        advance(&mut state, &mut rng, 8000.0);
        assert_eq!(state.last_meteor_spawn_at, 1200.0);
        assert!(!state.drain_events().contains(&GameEvent::MeteorShower));
    }

    #[test]
    fn test_black_hole_timer_and_cap() {
        let mut rng = SeededSource::new(35);
        let mut state = running_state(BoundaryMode::Wrap);
        state.gates.black_holes = true;
        state.next_black_hole_at = 0.0;
        for x in 1..=MAX_BLACK_HOLES as i32 {
            state.add_entity(EntityKind::BlackHole {
                cell: Cell::new(x, 2),
                expires_at: 1.0e9,
            });
        }

        // At the cap: the timer rolls over without a spawn
        advance(&mut state, &mut rng, 0.0);
        assert_eq!(black_hole_count(&state), MAX_BLACK_HOLES);
        let wait = state.next_black_hole_at;
        assert!(wait >= BLACK_HOLE_COOLDOWN_MS);
        assert!(wait < BLACK_HOLE_COOLDOWN_MS + BLACK_HOLE_COOLDOWN_JITTER_MS);

        state
            .entities
            .retain(|e| !matches!(e.kind, EntityKind::BlackHole { cell, .. } if cell.x == 1));
        advance(&mut state, &mut rng, wait - 1.0);
        assert_eq!(black_hole_count(&state), MAX_BLACK_HOLES - 1);

        advance(&mut state, &mut rng, wait);
        assert_eq!(black_hole_count(&state), MAX_BLACK_HOLES);
        assert!(state.next_black_hole_at >= wait + BLACK_HOLE_COOLDOWN_MS);
    }

    #[test]
    fn test_comet_contact_scores_and_shields() {
        let mut rng = SeededSource::new(36);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::Comet {
            cell: Cell::new(11, 10),
            velocity: Cell::new(0, 1),
            expires_at: COMET_LIFETIME_MS,
            last_move_at: 0.0,
        });
        advance(&mut state, &mut rng, 0.0);

        assert_eq!(state.score, COMET_POINTS);
        assert_eq!(state.snake.len(), 4);
        assert!(state.effects.in_grace(COMET_GRACE_MS - 1.0));
        assert!(!state.effects.in_grace(COMET_GRACE_MS));
        assert!(state.entities.is_empty());
    }

    #[test]
    fn test_constellation_in_order_celebrates() {
        let mut rng = SeededSource::new(37);
        let mut state = running_state(BoundaryMode::Wrap);
        state.add_entity(EntityKind::Constellation {
            points: vec![Cell::new(11, 10), Cell::new(12, 10)],
            next: 0,
            expires_at: CONSTELLATION_LIFETIME_MS,
        });

        advance(&mut state, &mut rng, 0.0);
        assert_eq!(state.score, 0);
        assert_eq!(state.entities.len(), 1);

        advance(&mut state, &mut rng, 120.0);
        assert_eq!(state.score, CONSTELLATION_POINTS);
        assert!(state.entities.is_empty());
        assert!(state.drain_events().contains(&GameEvent::Celebration {
            cell: Cell::new(12, 10)
        }));
    }
}
