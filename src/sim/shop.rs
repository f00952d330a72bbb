//! Stardust shop

use serde::{Deserialize, Serialize};

use super::effects::EffectKind;
use super::state::{GameEvent, GameState};
use crate::consts::SHOP_COST;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopItem {
    Shield,
    Magnet,
    SlowMo,
}

impl ShopItem {
    pub fn effect(self) -> EffectKind {
        match self {
            ShopItem::Shield => EffectKind::Shield,
            ShopItem::Magnet => EffectKind::Magnet,
            ShopItem::SlowMo => EffectKind::SlowMo,
        }
    }

    pub fn cost(self) -> u32 {
        SHOP_COST
    }
}

/// Spend stardust on an item. Returns false if the player can't afford it.
pub fn purchase(state: &mut GameState, item: ShopItem, now: f64) -> bool {
    if state.stardust < item.cost() {
        log::debug!("Not enough stardust for {:?}", item);
        return false;
    }
    state.stardust -= item.cost();
    let effect = item.effect();
    state.effects.grant(effect, effect.power_grant(), now);
    state.push_event(GameEvent::EffectGranted { effect });
    true
}
