//! Ledger records and where they live
//!
//! Each record decodes from an `EncodedState` and carries its own rule for
//! what an absent value means.

pub mod avatar;
pub mod collection;
pub mod game_config;
pub mod slots;
pub mod stats;

pub use avatar::{AvatarState, Costume, ElementalType, Equipment, Item};
pub use collection::CollectionState;
pub use game_config::GameConfig;
pub use slots::{ItemSlotRecord, RuneSlot, RuneSlotRecord, RuneState};
pub use stats::{ModifyOperation, StatModifier, StatType, StatValue};

use crate::core::types::{Address, BattleType, RuneId};

/// Well-known address of the game config state (legacy account)
pub const GAME_CONFIG_ADDRESS: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x03,
]);

pub fn item_slot_address(avatar: &Address, battle_type: BattleType) -> Address {
    avatar.derive(&format!("item_slot_{}", battle_type))
}

pub fn rune_slot_address(avatar: &Address, battle_type: BattleType) -> Address {
    avatar.derive(&format!("rune_slot_{}", battle_type))
}

pub fn rune_state_address(avatar: &Address, rune_id: RuneId) -> Address {
    avatar.derive(&format!("rune_{}", rune_id))
}
