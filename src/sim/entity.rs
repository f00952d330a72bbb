//! Collectible and hazard entities
//!
//! Every variant carries only the fields it needs. The tick engine talks to
//! them through a small capability set: `cells`, `occupies`, `is_expired`,
//! `collectible_cells`, `hazard`, `teleport_at` and `on_contact`.

use serde::{Deserialize, Serialize};

use super::effects::EffectKind;
use super::grid::{Direction, Rect};
use crate::consts::*;
use crate::{Cell, wrap_cell};

/// Which endpoint of a two-cell entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    A,
    B,
}

/// Lethal hazard classes, checked at different collision priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardClass {
    /// Asteroids and mines
    Static,
    /// Meteors and belt rocks
    Moving,
}

/// Teleport classes, applied in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TeleportClass {
    WarpGate,
    BlackHole,
    OneWayGate,
}

/// Where a teleport sends the head
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TeleportTarget {
    Cell(Cell),
    RandomSafeCell,
}

/// A teleport triggered by the head landing on an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Teleport {
    pub class: TeleportClass,
    pub target: TeleportTarget,
    pub grace_ms: f64,
}

/// What the head touched, as seen by the entity
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub cell: Cell,
    pub prev_head: Cell,
    pub now: f64,
}

/// Result of a collectible being touched
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactOutcome {
    /// Touched but nothing happens (wrong approach, invisible phase)
    Nothing,
    /// Partial progress: quantum pair armed, constellation advanced
    Progress,
    /// Removed without reward
    Fizzle,
    /// Removed, points awarded, optional stardust roll
    Award { points: u64, stardust_chance: f64 },
    /// Removed, points awarded, nearby asteroids and mines cleared
    Nova { points: u64, center: Cell },
    /// Removed, points awarded, celebration
    Constellation { points: u64 },
    /// Removed, points awarded, long grace window
    Comet { points: u64 },
    /// Removed, status effect granted
    Grant(EffectKind),
}

impl ContactOutcome {
    /// Whether the touched entity goes away
    pub fn removes(&self) -> bool {
        !matches!(self, ContactOutcome::Nothing | ContactOutcome::Progress)
    }

    /// Base points before multipliers
    pub fn points(&self) -> u64 {
        match self {
            ContactOutcome::Award { points, .. }
            | ContactOutcome::Nova { points, .. }
            | ContactOutcome::Constellation { points }
            | ContactOutcome::Comet { points } => *points,
            _ => 0,
        }
    }
}

/// Arming state of a quantum pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantumArm {
    pub first: Endpoint,
    pub deadline: f64,
}

/// Entity variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    ExtraStar {
        cell: Cell,
    },
    BonusStar {
        cell: Cell,
        expires_at: f64,
    },
    /// Spans `left` and the cell to its right
    WideStar {
        left: Cell,
        expires_at: f64,
    },
    BlinkStar {
        cell: Cell,
        born_at: f64,
        expires_at: f64,
    },
    RingStar {
        cell: Cell,
        expires_at: f64,
    },
    NovaCore {
        cell: Cell,
        expires_at: f64,
    },
    QuantumPair {
        a: Cell,
        b: Cell,
        armed: Option<QuantumArm>,
        expires_at: f64,
    },
    Constellation {
        points: Vec<Cell>,
        next: usize,
        expires_at: f64,
    },
    PowerStar {
        cell: Cell,
        effect: EffectKind,
        expires_at: f64,
    },
    Comet {
        cell: Cell,
        velocity: Cell,
        expires_at: f64,
        last_move_at: f64,
    },
    Asteroid {
        cell: Cell,
    },
    SpaceMine {
        cell: Cell,
    },
    Meteor {
        cell: Cell,
    },
    /// A full row of rocks with gaps, scrolling right
    AsteroidBelt {
        row: i32,
        width: i32,
        offset: i32,
        last_scroll_at: f64,
    },
    BlackHole {
        cell: Cell,
        expires_at: f64,
    },
    Planet {
        cell: Cell,
        radius: i32,
    },
    WarpGate {
        a: Cell,
        b: Cell,
    },
    OneWayGate {
        from: Cell,
        to: Cell,
    },
    TimeField {
        area: Rect,
        factor: f64,
    },
    SolarWind {
        top: i32,
        bottom: i32,
        push: Direction,
    },
    RadiationZone {
        area: Rect,
    },
}

/// An entity with a stable id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(id: u32, kind: EntityKind) -> Self {
        Self { id, kind }
    }

    /// Short name for presentation and logs
    pub fn name(&self) -> &'static str {
        match &self.kind {
            EntityKind::ExtraStar { .. } => "extra_star",
            EntityKind::BonusStar { .. } => "bonus_star",
            EntityKind::WideStar { .. } => "wide_star",
            EntityKind::BlinkStar { .. } => "blink_star",
            EntityKind::RingStar { .. } => "ring_star",
            EntityKind::NovaCore { .. } => "nova_core",
            EntityKind::QuantumPair { .. } => "quantum_pair",
            EntityKind::Constellation { .. } => "constellation",
            EntityKind::PowerStar { .. } => "power_star",
            EntityKind::Comet { .. } => "comet",
            EntityKind::Asteroid { .. } => "asteroid",
            EntityKind::SpaceMine { .. } => "space_mine",
            EntityKind::Meteor { .. } => "meteor",
            EntityKind::AsteroidBelt { .. } => "asteroid_belt",
            EntityKind::BlackHole { .. } => "black_hole",
            EntityKind::Planet { .. } => "planet",
            EntityKind::WarpGate { .. } => "warp_gate",
            EntityKind::OneWayGate { .. } => "one_way_gate",
            EntityKind::TimeField { .. } => "time_field",
            EntityKind::SolarWind { .. } => "solar_wind",
            EntityKind::RadiationZone { .. } => "radiation_zone",
        }
    }

    /// Cells this entity reserves against new spawns.
    /// Zones (time fields, winds, radiation) reserve nothing.
    pub fn cells(&self) -> Vec<Cell> {
        match &self.kind {
            EntityKind::ExtraStar { cell }
            | EntityKind::BonusStar { cell, .. }
            | EntityKind::BlinkStar { cell, .. }
            | EntityKind::RingStar { cell, .. }
            | EntityKind::NovaCore { cell, .. }
            | EntityKind::PowerStar { cell, .. }
            | EntityKind::Comet { cell, .. }
            | EntityKind::Asteroid { cell }
            | EntityKind::SpaceMine { cell }
            | EntityKind::Meteor { cell }
            | EntityKind::BlackHole { cell, .. }
            | EntityKind::Planet { cell, .. } => vec![*cell],
            EntityKind::WideStar { left, .. } => vec![*left, *left + Cell::X],
            EntityKind::QuantumPair { a, b, .. } | EntityKind::WarpGate { a, b } => vec![*a, *b],
            EntityKind::OneWayGate { from, to } => vec![*from, *to],
            EntityKind::Constellation { points, .. } => points.clone(),
            EntityKind::AsteroidBelt { row, width, .. } => {
                (0..*width).map(|x| Cell::new(x, *row)).collect()
            }
            EntityKind::TimeField { .. }
            | EntityKind::SolarWind { .. }
            | EntityKind::RadiationZone { .. } => Vec::new(),
        }
    }

    /// Whether the entity is physically at `cell` right now
    pub fn occupies(&self, cell: Cell) -> bool {
        match &self.kind {
            EntityKind::AsteroidBelt { row, offset, .. } => {
                cell.y == *row && belt_rock_at(cell.x, *offset)
            }
            EntityKind::TimeField { area, .. } | EntityKind::RadiationZone { area } => {
                area.contains(cell)
            }
            EntityKind::SolarWind { top, bottom, .. } => cell.y >= *top && cell.y <= *bottom,
            _ => self.cells().contains(&cell),
        }
    }

    pub fn is_expired(&self, now: f64) -> bool {
        match &self.kind {
            EntityKind::BonusStar { expires_at, .. }
            | EntityKind::WideStar { expires_at, .. }
            | EntityKind::BlinkStar { expires_at, .. }
            | EntityKind::RingStar { expires_at, .. }
            | EntityKind::NovaCore { expires_at, .. }
            | EntityKind::Constellation { expires_at, .. }
            | EntityKind::PowerStar { expires_at, .. }
            | EntityKind::BlackHole { expires_at, .. } => now >= *expires_at,
            EntityKind::Comet { expires_at, .. } => now > *expires_at,
            EntityKind::QuantumPair {
                armed, expires_at, ..
            } => match armed {
                Some(arm) => now > arm.deadline,
                None => now >= *expires_at,
            },
            _ => false,
        }
    }

    /// Cells a drone may pick up right now
    pub fn collectible_cells(&self, now: f64) -> Vec<Cell> {
        match &self.kind {
            EntityKind::BlinkStar { cell, born_at, .. } => {
                if blink_visible(*born_at, now) {
                    vec![*cell]
                } else {
                    Vec::new()
                }
            }
            EntityKind::Constellation { points, next, .. } => {
                points.get(*next).copied().into_iter().collect()
            }
            EntityKind::ExtraStar { .. }
            | EntityKind::BonusStar { .. }
            | EntityKind::WideStar { .. }
            | EntityKind::RingStar { .. }
            | EntityKind::NovaCore { .. }
            | EntityKind::QuantumPair { .. }
            | EntityKind::PowerStar { .. }
            | EntityKind::Comet { .. } => self.cells(),
            _ => Vec::new(),
        }
    }

    pub fn is_collectible(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::ExtraStar { .. }
                | EntityKind::BonusStar { .. }
                | EntityKind::WideStar { .. }
                | EntityKind::BlinkStar { .. }
                | EntityKind::RingStar { .. }
                | EntityKind::NovaCore { .. }
                | EntityKind::QuantumPair { .. }
                | EntityKind::Constellation { .. }
                | EntityKind::PowerStar { .. }
                | EntityKind::Comet { .. }
        )
    }

    pub fn hazard(&self) -> Option<HazardClass> {
        match self.kind {
            EntityKind::Asteroid { .. } | EntityKind::SpaceMine { .. } => {
                Some(HazardClass::Static)
            }
            EntityKind::Meteor { .. } | EntityKind::AsteroidBelt { .. } => {
                Some(HazardClass::Moving)
            }
            _ => None,
        }
    }

    /// Teleport triggered by the head landing exactly on `cell`
    pub fn teleport_at(&self, cell: Cell) -> Option<Teleport> {
        match &self.kind {
            EntityKind::WarpGate { a, b } => {
                let target = if cell == *a {
                    *b
                } else if cell == *b {
                    *a
                } else {
                    return None;
                };
                Some(Teleport {
                    class: TeleportClass::WarpGate,
                    target: TeleportTarget::Cell(target),
                    grace_ms: WARP_GATE_GRACE_MS,
                })
            }
            EntityKind::BlackHole { cell: hole, .. } if *hole == cell => Some(Teleport {
                class: TeleportClass::BlackHole,
                target: TeleportTarget::RandomSafeCell,
                grace_ms: BLACK_HOLE_GRACE_MS,
            }),
            EntityKind::OneWayGate { from, to } if *from == cell => Some(Teleport {
                class: TeleportClass::OneWayGate,
                target: TeleportTarget::Cell(*to),
                grace_ms: 0.0,
            }),
            _ => None,
        }
    }

    /// Resolve the head touching this collectible
    pub fn on_contact(&mut self, contact: &Contact) -> ContactOutcome {
        match &mut self.kind {
            EntityKind::ExtraStar { .. } => ContactOutcome::Award {
                points: 1,
                stardust_chance: 0.0,
            },
            EntityKind::BonusStar { .. } => ContactOutcome::Award {
                points: BONUS_STAR_POINTS,
                stardust_chance: BONUS_STARDUST_CHANCE,
            },
            EntityKind::WideStar { left, .. } => {
                // A purely horizontal approach slides along the star
                if contact.prev_head.y != left.y {
                    ContactOutcome::Award {
                        points: WIDE_STAR_POINTS,
                        stardust_chance: 0.0,
                    }
                } else {
                    ContactOutcome::Nothing
                }
            }
            EntityKind::BlinkStar { born_at, .. } => {
                if blink_visible(*born_at, contact.now) {
                    ContactOutcome::Award {
                        points: BLINK_STAR_POINTS,
                        stardust_chance: 0.0,
                    }
                } else {
                    ContactOutcome::Nothing
                }
            }
            EntityKind::RingStar { .. } => ContactOutcome::Award {
                points: RING_STAR_POINTS,
                stardust_chance: 0.0,
            },
            EntityKind::NovaCore { cell, .. } => ContactOutcome::Nova {
                points: NOVA_CORE_POINTS,
                center: *cell,
            },
            EntityKind::QuantumPair { a, b, armed, .. } => {
                let touched = if contact.cell == *a {
                    Endpoint::A
                } else if contact.cell == *b {
                    Endpoint::B
                } else {
                    return ContactOutcome::Nothing;
                };
                match *armed {
                    None => {
                        *armed = Some(QuantumArm {
                            first: touched,
                            deadline: contact.now + QUANTUM_WINDOW_MS,
                        });
                        ContactOutcome::Progress
                    }
                    Some(arm) if contact.now > arm.deadline => ContactOutcome::Fizzle,
                    Some(arm) if arm.first != touched => ContactOutcome::Award {
                        points: QUANTUM_PAIR_POINTS,
                        stardust_chance: 0.0,
                    },
                    Some(_) => ContactOutcome::Nothing,
                }
            }
            EntityKind::Constellation { points, next, .. } => {
                if points.get(*next) != Some(&contact.cell) {
                    return ContactOutcome::Nothing;
                }
                *next += 1;
                if *next >= points.len() {
                    ContactOutcome::Constellation {
                        points: CONSTELLATION_POINTS,
                    }
                } else {
                    ContactOutcome::Progress
                }
            }
            EntityKind::PowerStar { effect, .. } => ContactOutcome::Grant(*effect),
            EntityKind::Comet { .. } => ContactOutcome::Comet {
                points: COMET_POINTS,
            },
            _ => ContactOutcome::Nothing,
        }
    }

    /// Per-tick motion for moving entities. Returns false if the entity left
    /// the grid and should be dropped.
    pub fn advance_motion(&mut self, now: f64, grid_size: i32, wrap: bool) -> bool {
        match &mut self.kind {
            EntityKind::Meteor { cell } => {
                cell.y += 1;
                cell.y < grid_size
            }
            EntityKind::Comet {
                cell,
                velocity,
                last_move_at,
                ..
            } => {
                if now - *last_move_at >= COMET_MOVE_INTERVAL_MS {
                    *last_move_at = now;
                    let next = *cell + *velocity;
                    if wrap {
                        *cell = wrap_cell(next, grid_size);
                    } else {
                        if next.x < 0 || next.x >= grid_size {
                            velocity.x = -velocity.x;
                        }
                        if next.y < 0 || next.y >= grid_size {
                            velocity.y = -velocity.y;
                        }
                        *cell = next.clamp(Cell::ZERO, Cell::splat(grid_size - 1));
                    }
                }
                true
            }
            EntityKind::AsteroidBelt {
                offset,
                last_scroll_at,
                ..
            } => {
                if now - *last_scroll_at >= BELT_SCROLL_INTERVAL_MS {
                    *last_scroll_at = now;
                    *offset = (*offset + 1).rem_euclid(BELT_PERIOD);
                }
                true
            }
            _ => true,
        }
    }
}

/// Blink stars are collectible during the first half of each period
pub fn blink_visible(born_at: f64, now: f64) -> bool {
    let phase = (now - born_at).rem_euclid(BLINK_PERIOD_MS);
    phase < BLINK_PERIOD_MS / 2.0
}

/// Belt rock pattern for column `x` at scroll `offset`
pub fn belt_rock_at(x: i32, offset: i32) -> bool {
    (x - offset).rem_euclid(BELT_PERIOD) < BELT_ROCKS
}
