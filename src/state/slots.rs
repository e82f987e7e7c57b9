//! Loadout slot records and per-rune states

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{BattleType, ItemId, RuneId};
use crate::gateway::EncodedState;

/// Equipment and costumes equipped for one battle context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSlotRecord {
    pub battle_type: BattleType,
    #[serde(default)]
    pub equipments: Vec<ItemId>,
    #[serde(default)]
    pub costumes: Vec<ItemId>,
}

impl ItemSlotRecord {
    /// Nothing equipped
    pub fn empty(battle_type: BattleType) -> Self {
        Self {
            battle_type,
            equipments: Vec::new(),
            costumes: Vec::new(),
        }
    }

    /// Decode a fetched record; an absent record means nothing is equipped
    pub fn from_state(battle_type: BattleType, state: Option<EncodedState>) -> Result<Self> {
        match state {
            Some(state) => state.decode("item slot record"),
            None => Ok(Self::empty(battle_type)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneSlot {
    pub index: u8,
    pub rune_id: Option<RuneId>,
    #[serde(default)]
    pub locked: bool,
}

/// Rune slots for one battle context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuneSlotRecord {
    pub battle_type: BattleType,
    #[serde(default)]
    pub slots: Vec<RuneSlot>,
}

impl RuneSlotRecord {
    pub fn empty(battle_type: BattleType) -> Self {
        Self {
            battle_type,
            slots: Vec::new(),
        }
    }

    pub fn from_state(battle_type: BattleType, state: Option<EncodedState>) -> Result<Self> {
        match state {
            Some(state) => state.decode("rune slot record"),
            None => Ok(Self::empty(battle_type)),
        }
    }

    /// Rune ids in occupied slots, ordered by slot index
    pub fn equipped_rune_ids(&self) -> Vec<RuneId> {
        let mut occupied: Vec<&RuneSlot> = self.slots.iter().filter(|s| s.rune_id.is_some()).collect();
        occupied.sort_by_key(|s| s.index);
        occupied.into_iter().filter_map(|s| s.rune_id).collect()
    }
}

/// Leveled state of one owned rune
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneState {
    pub rune_id: RuneId,
    pub level: u32,
}

impl RuneState {
    pub fn new(rune_id: RuneId, level: u32) -> Self {
        Self { rune_id, level }
    }
}
