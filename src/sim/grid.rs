//! Grid primitives: directions, boundary policies and rectangles

use serde::{Deserialize, Serialize};

use crate::Cell;

/// Direction the snake can move (screen coordinates, y grows down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step for this direction
    pub fn step(self) -> Cell {
        match self {
            Direction::Up => Cell::new(0, -1),
            Direction::Down => Cell::new(0, 1),
            Direction::Left => Cell::new(-1, 0),
            Direction::Right => Cell::new(1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Returns true if turning from self to other would be a 180-degree turn
    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// Whether this direction moves along the x axis
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    /// Axis-aligned direction from a unit step, if it is one
    pub fn from_step(step: Cell) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| d.step() == step)
    }
}

/// What happens when the head leaves the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Leaving the grid is lethal
    Blocked,
    /// Toroidal wrap on both axes
    #[default]
    Wrap,
    /// Leaving the grid relocates the head to a random safe cell
    Portal,
}

impl BoundaryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryMode::Blocked => "blocked",
            BoundaryMode::Wrap => "wrap",
            BoundaryMode::Portal => "portal",
        }
    }
}

/// Inclusive axis-aligned rectangle of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Cell,
    pub max: Cell,
}

impl Rect {
    pub fn new(min: Cell, max: Cell) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| Cell::new(x, y)))
    }
}
