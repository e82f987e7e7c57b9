//! Combatant digests
//!
//! A digest is the canonical simulation input for one combatant: who they are
//! plus what they have equipped. It is built fresh for every request and never
//! persisted.

pub mod remote;

use serde::{Deserialize, Serialize};

use crate::core::types::{Address, CharacterId};
use crate::state::{AvatarState, Costume, Equipment, ItemSlotRecord, RuneSlotRecord, RuneState};

pub use remote::{
    build_remote_digest, fetch_avatar, fetch_collection_state, fetch_combatant,
    fetch_equipped_rune_states, fetch_game_config, fetch_item_slots, fetch_rune_slots,
    CombatantSnapshot,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantDigest {
    pub address: Address,
    pub name: String,
    pub level: u32,
    pub character_id: CharacterId,
    pub equipments: Vec<Equipment>,
    pub costumes: Vec<Costume>,
    pub runes: Vec<RuneState>,
}

impl CombatantDigest {
    /// Replace the slot-derived equipment with a hypothetical loadout
    pub fn with_equipments(mut self, equipments: Vec<Equipment>) -> Self {
        self.equipments = equipments;
        self
    }
}

/// Assemble a digest from state already in memory.
///
/// Slot ids that do not resolve to an item of the right kind in the avatar's
/// inventory are dropped.
pub fn build_digest(
    avatar: &AvatarState,
    item_slots: &ItemSlotRecord,
    rune_states: &[RuneState],
) -> CombatantDigest {
    let equipments: Vec<Equipment> = item_slots
        .equipments
        .iter()
        .filter_map(|id| avatar.equipment(*id).cloned())
        .collect();
    let costumes: Vec<Costume> = item_slots
        .costumes
        .iter()
        .filter_map(|id| avatar.costume(*id).cloned())
        .collect();

    let dropped = item_slots.equipments.len() + item_slots.costumes.len()
        - equipments.len()
        - costumes.len();
    if dropped > 0 {
        tracing::debug!(
            avatar = %avatar.address,
            dropped,
            "slot items missing from inventory were skipped"
        );
    }

    CombatantDigest {
        address: avatar.address,
        name: avatar.name.clone(),
        level: avatar.level,
        character_id: avatar.character_id,
        equipments,
        costumes,
        runes: rune_states.to_vec(),
    }
}

/// Owned rune states that occupy a slot, in slot order
pub fn equipped_rune_states(slots: &RuneSlotRecord, owned: &[RuneState]) -> Vec<RuneState> {
    slots
        .equipped_rune_ids()
        .into_iter()
        .filter_map(|id| owned.iter().find(|r| r.rune_id == id).copied())
        .collect()
}
