//! Movement properties over random inputs

use proptest::prelude::*;
use star_snake::Cell;
use star_snake::sim::{
    BoundaryMode, Direction, GameState, RunMode, RunPhase, SeededSource, Snake, advance,
};

/// Adjacent on a torus of side `size`
fn wrapped_adjacent(a: Cell, b: Cell, size: i32) -> bool {
    let dx = (a.x - b.x).rem_euclid(size);
    let dy = (a.y - b.y).rem_euclid(size);
    let near = |d: i32| d == 1 || d == size - 1;
    (near(dx) && dy == 0) || (dx == 0 && near(dy))
}

fn running(size: i32, snake: Snake, star: Cell) -> GameState {
    let mut state = GameState::blank(size, BoundaryMode::Wrap, RunMode::Classic);
    state.snake = snake;
    state.star = star;
    state.phase = RunPhase::Running;
    state
}

proptest! {
    #[test]
    fn wrap_maps_edges_for_every_grid_size(size in 16i32..=24, row in 0i32..16) {
        let mut rng = SeededSource::new(1);
        let star = Cell::new(size / 2, (row + 3) % size);

        let mut rightward = running(size, Snake::new(Cell::new(size - 1, row), Direction::Right, 3), star);
        advance(&mut rightward, &mut rng, 0.0);
        prop_assert_eq!(rightward.snake.head(), Cell::new(0, row));

        let mut leftward = running(size, Snake::new(Cell::new(0, row), Direction::Left, 3), star);
        advance(&mut leftward, &mut rng, 0.0);
        prop_assert_eq!(leftward.snake.head(), Cell::new(size - 1, row));
    }

    #[test]
    fn body_stays_contiguous(
        seed in any::<u64>(),
        size in 16i32..=24,
        turns in prop::collection::vec(0usize..4, 1..200),
    ) {
        let mut rng = SeededSource::new(seed);
        let mut state = running(size, Snake::spawn(size), Cell::new(1, 1));
        let mut now = 0.0;

        for turn in turns {
            state.snake.handle_direction_change(Direction::ALL[turn]);
            now += state.tick_interval_ms;
            advance(&mut state, &mut rng, now);
            if state.phase != RunPhase::Running {
                break;
            }

            let body: Vec<Cell> = state.snake.body.iter().copied().collect();
            for pair in body.windows(2) {
                prop_assert!(wrapped_adjacent(pair[0], pair[1], size));
            }
            let mut unique = body.clone();
            unique.sort_by_key(|c| (c.x, c.y));
            unique.dedup();
            prop_assert_eq!(unique.len(), body.len());
        }
    }

    #[test]
    fn reverse_turn_never_applies(dir in 0usize..4) {
        let mut rng = SeededSource::new(2);
        let facing = Direction::ALL[dir];
        let mut state = running(20, Snake::new(Cell::new(10, 10), facing, 3), Cell::new(1, 1));
        prop_assert!(!state.snake.handle_direction_change(facing.opposite()));
        advance(&mut state, &mut rng, 0.0);
        prop_assert_eq!(state.snake.direction, facing);
        prop_assert_eq!(state.snake.head(), Cell::new(10, 10) + facing.step());
    }
}
