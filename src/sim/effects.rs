//! Status-effect ledger
//!
//! Timed effects compare `now < expires_at`, charge effects count down, and the
//! shield is an armed flag that turns into grace invincibility when consumed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::SHIELD_BREAK_GRACE_MS;

/// Kinds of status effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Absorbs one lethal collision
    Shield,
    /// Pulls nearby stars toward the head
    Magnet,
    /// Doubles the effective tick interval
    SlowMo,
    /// Suppresses self-collision
    Phase,
    /// Freezes moving hazards
    Stasis,
    /// Auto-collects nearby collectibles
    Drone,
    /// Shortens the tick interval
    SpeedBoost,
    /// Doubles star awards
    DoubleScore,
    /// Charges spent on a manual warp
    Warp,
}

impl EffectKind {
    /// What a power star of this kind grants
    pub fn power_grant(self) -> Grant {
        match self {
            EffectKind::Shield => Grant::Arm,
            EffectKind::Warp => Grant::Charges(1),
            EffectKind::Magnet => Grant::Duration(8000.0),
            EffectKind::SlowMo => Grant::Duration(6000.0),
            EffectKind::Phase => Grant::Duration(5000.0),
            EffectKind::Stasis => Grant::Duration(5000.0),
            EffectKind::Drone => Grant::Duration(6000.0),
            EffectKind::SpeedBoost => Grant::Duration(5000.0),
            EffectKind::DoubleScore => Grant::Duration(8000.0),
        }
    }
}

/// How an effect is granted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Grant {
    Duration(f64),
    Charges(u32),
    Arm,
}

/// A ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Expiry {
    Until(f64),
    Charges(u32),
    Armed,
}

/// Why the actor survives a lethal contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Timed grace window: pass through untouched
    Grace,
    /// Shield is armed: consume it
    Shield,
}

/// Active status effects plus the grace invincibility window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusEffects {
    entries: BTreeMap<EffectKind, Expiry>,
    /// Grace invincibility ends at this timestamp
    pub invincible_until: f64,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant or extend an effect. Durations restart from `now`, charges stack.
    pub fn grant(&mut self, kind: EffectKind, grant: Grant, now: f64) {
        let entry = match (grant, self.entries.get(&kind)) {
            (Grant::Duration(ms), Some(Expiry::Until(t))) => Expiry::Until(t.max(now + ms)),
            (Grant::Duration(ms), _) => Expiry::Until(now + ms),
            (Grant::Charges(n), Some(Expiry::Charges(c))) => Expiry::Charges(c.saturating_add(n)),
            (Grant::Charges(n), _) => Expiry::Charges(n),
            (Grant::Arm, _) => Expiry::Armed,
        };
        self.entries.insert(kind, entry);
    }

    pub fn is_active(&self, kind: EffectKind, now: f64) -> bool {
        match self.entries.get(&kind) {
            Some(Expiry::Until(t)) => now < *t,
            Some(Expiry::Charges(c)) => *c > 0,
            Some(Expiry::Armed) => true,
            None => false,
        }
    }

    /// Spend one use of a charge effect or the shield.
    /// Returns false if nothing was there to consume.
    pub fn consume(&mut self, kind: EffectKind, now: f64) -> bool {
        match self.entries.get_mut(&kind) {
            Some(Expiry::Charges(c)) if *c > 0 => {
                *c -= 1;
                if *c == 0 {
                    self.entries.remove(&kind);
                }
                true
            }
            Some(Expiry::Armed) => {
                self.entries.remove(&kind);
                if kind == EffectKind::Shield {
                    self.grant_grace(now, SHIELD_BREAK_GRACE_MS);
                }
                true
            }
            Some(Expiry::Until(t)) if now < *t => {
                self.entries.remove(&kind);
                true
            }
            _ => false,
        }
    }

    /// Extend grace invincibility to at least `now + ms`
    pub fn grant_grace(&mut self, now: f64, ms: f64) {
        self.invincible_until = self.invincible_until.max(now + ms);
    }

    pub fn in_grace(&self, now: f64) -> bool {
        now < self.invincible_until
    }

    /// Grace wins over shield so a shield is never spent inside a grace window
    pub fn protection(&self, now: f64) -> Option<Protection> {
        if self.in_grace(now) {
            Some(Protection::Grace)
        } else if self.is_active(EffectKind::Shield, now) {
            Some(Protection::Shield)
        } else {
            None
        }
    }

    pub fn charges(&self, kind: EffectKind) -> u32 {
        match self.entries.get(&kind) {
            Some(Expiry::Charges(c)) => *c,
            _ => 0,
        }
    }

    /// Milliseconds left on a timed effect (0 if inactive or not timed)
    pub fn remaining_ms(&self, kind: EffectKind, now: f64) -> f64 {
        match self.entries.get(&kind) {
            Some(Expiry::Until(t)) => (t - now).max(0.0),
            _ => 0.0,
        }
    }

    /// Drop timers that have run out
    pub fn prune(&mut self, now: f64) {
        self.entries.retain(|_, e| match e {
            Expiry::Until(t) => now < *t,
            Expiry::Charges(c) => *c > 0,
            Expiry::Armed => true,
        });
    }

    /// Effects active at `now`, in kind order
    pub fn active(&self, now: f64) -> impl Iterator<Item = (EffectKind, Expiry)> + '_ {
        self.entries
            .iter()
            .filter(move |(k, _)| self.is_active(**k, now))
            .map(|(k, e)| (*k, *e))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.invincible_until = 0.0;
    }
}
