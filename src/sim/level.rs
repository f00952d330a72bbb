//! Level catalog and feature gates
//!
//! Levels are pure data. Each level's `FeatureGateSet` is copied wholesale into
//! the game state on every level transition and never mutated piecemeal.

use serde::{Deserialize, Serialize};

use super::effects::EffectKind;
use super::grid::BoundaryMode;

/// Which entity categories a level enables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureGateSet {
    pub bonus_star: bool,
    pub extra_stars: bool,
    pub wide_star: bool,
    pub blink_star: bool,
    pub ring_star: bool,
    pub nova_core: bool,
    pub quantum_pair: bool,
    pub constellation: bool,
    pub power_stars: bool,
    pub comet: bool,
    pub meteors: bool,
    pub black_holes: bool,
    pub planets: bool,
    pub warp_gates: bool,
    pub one_way_gates: bool,
    pub time_fields: bool,
    pub asteroid_belt: bool,
    pub space_mines: bool,
    /// Reserved: no shipped level enables it
    pub radiation_zones: bool,
    /// Reserved: no shipped level enables it
    pub solar_wind: bool,
}

impl FeatureGateSet {
    pub const NONE: FeatureGateSet = FeatureGateSet {
        bonus_star: false,
        extra_stars: false,
        wide_star: false,
        blink_star: false,
        ring_star: false,
        nova_core: false,
        quantum_pair: false,
        constellation: false,
        power_stars: false,
        comet: false,
        meteors: false,
        black_holes: false,
        planets: false,
        warp_gates: false,
        one_way_gates: false,
        time_fields: false,
        asteroid_belt: false,
        space_mines: false,
        radiation_zones: false,
        solar_wind: false,
    };

    /// Number of enabled gates (used for logging)
    pub fn enabled_count(&self) -> usize {
        [
            self.bonus_star,
            self.extra_stars,
            self.wide_star,
            self.blink_star,
            self.ring_star,
            self.nova_core,
            self.quantum_pair,
            self.constellation,
            self.power_stars,
            self.comet,
            self.meteors,
            self.black_holes,
            self.planets,
            self.warp_gates,
            self.one_way_gates,
            self.time_fields,
            self.asteroid_belt,
            self.space_mines,
            self.radiation_zones,
            self.solar_wind,
        ]
        .iter()
        .filter(|g| **g)
        .count()
    }
}

/// One entry of the level catalog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelConfig {
    pub grid_size: i32,
    pub base_tick_interval_ms: f64,
    pub boundary: BoundaryMode,
    pub obstacles_enabled: bool,
    pub gates: FeatureGateSet,
    /// Status effects a power star may grant on this level
    pub power_kinds: &'static [EffectKind],
    pub star_target: u32,
}

const LEVEL_2_GATES: FeatureGateSet = FeatureGateSet {
    bonus_star: true,
    power_stars: true,
    planets: true,
    warp_gates: true,
    ..FeatureGateSet::NONE
};

const LEVEL_3_GATES: FeatureGateSet = FeatureGateSet {
    extra_stars: true,
    wide_star: true,
    comet: true,
    meteors: true,
    ..LEVEL_2_GATES
};

const LEVEL_4_GATES: FeatureGateSet = FeatureGateSet {
    blink_star: true,
    ring_star: true,
    black_holes: true,
    one_way_gates: true,
    time_fields: true,
    ..LEVEL_3_GATES
};

const LEVEL_5_GATES: FeatureGateSet = FeatureGateSet {
    nova_core: true,
    quantum_pair: true,
    space_mines: true,
    asteroid_belt: true,
    ..LEVEL_4_GATES
};

const LEVEL_6_GATES: FeatureGateSet = FeatureGateSet {
    constellation: true,
    ..LEVEL_5_GATES
};

/// The campaign, easiest first
pub const LEVELS: [LevelConfig; 6] = [
    LevelConfig {
        grid_size: 16,
        base_tick_interval_ms: 130.0,
        boundary: BoundaryMode::Wrap,
        obstacles_enabled: false,
        gates: FeatureGateSet::NONE,
        power_kinds: &[],
        star_target: 10,
    },
    LevelConfig {
        grid_size: 18,
        base_tick_interval_ms: 125.0,
        boundary: BoundaryMode::Wrap,
        obstacles_enabled: true,
        gates: LEVEL_2_GATES,
        power_kinds: &[EffectKind::Shield, EffectKind::Magnet],
        star_target: 14,
    },
    LevelConfig {
        grid_size: 20,
        base_tick_interval_ms: 120.0,
        boundary: BoundaryMode::Wrap,
        obstacles_enabled: true,
        gates: LEVEL_3_GATES,
        power_kinds: &[
            EffectKind::Shield,
            EffectKind::Magnet,
            EffectKind::SlowMo,
            EffectKind::DoubleScore,
        ],
        star_target: 18,
    },
    LevelConfig {
        grid_size: 20,
        base_tick_interval_ms: 115.0,
        boundary: BoundaryMode::Portal,
        obstacles_enabled: true,
        gates: LEVEL_4_GATES,
        power_kinds: &[
            EffectKind::Shield,
            EffectKind::Magnet,
            EffectKind::SlowMo,
            EffectKind::DoubleScore,
            EffectKind::Phase,
            EffectKind::Warp,
        ],
        star_target: 22,
    },
    LevelConfig {
        grid_size: 22,
        base_tick_interval_ms: 110.0,
        boundary: BoundaryMode::Portal,
        obstacles_enabled: true,
        gates: LEVEL_5_GATES,
        power_kinds: &[
            EffectKind::Shield,
            EffectKind::Magnet,
            EffectKind::SlowMo,
            EffectKind::DoubleScore,
            EffectKind::Phase,
            EffectKind::Warp,
            EffectKind::Stasis,
            EffectKind::Drone,
        ],
        star_target: 26,
    },
    LevelConfig {
        grid_size: 24,
        base_tick_interval_ms: 105.0,
        boundary: BoundaryMode::Blocked,
        obstacles_enabled: true,
        gates: LEVEL_6_GATES,
        power_kinds: &[
            EffectKind::Shield,
            EffectKind::Magnet,
            EffectKind::SlowMo,
            EffectKind::DoubleScore,
            EffectKind::Phase,
            EffectKind::Warp,
            EffectKind::Stasis,
            EffectKind::Drone,
            EffectKind::SpeedBoost,
        ],
        star_target: 30,
    },
];

/// Catalog lookup, clamped to the final level
pub fn level_config(index: usize) -> &'static LevelConfig {
    &LEVELS[index.min(LEVELS.len() - 1)]
}

pub fn last_level_index() -> usize {
    LEVELS.len() - 1
}
