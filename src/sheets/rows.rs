//! Row types of the static rule tables

use serde::{Deserialize, Serialize};

use crate::core::types::{CharacterId, CollectionId, RuneId, StageId};
use crate::state::stats::StatModifier;

/// Base combat stats of a character (player class or monster)
///
/// Effective stat at level `n` is `base + growth * (n - 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRow {
    pub id: CharacterId,
    pub hp: i64,
    pub atk: i64,
    pub def: i64,
    pub spd: i64,
    #[serde(default)]
    pub cri: i64,
    #[serde(default)]
    pub hit: i64,
    #[serde(default)]
    pub lv_hp: i64,
    #[serde(default)]
    pub lv_atk: i64,
    #[serde(default)]
    pub lv_def: i64,
    #[serde(default)]
    pub lv_spd: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyRow {
    pub character_id: CharacterId,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveRow {
    pub enemies: Vec<EnemyRow>,
}

/// A PvE stage; clearing wave `k` earns tier `k`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRow {
    pub id: StageId,
    pub waves: Vec<WaveRow>,
}

/// Rune options; each is multiplied by the rune's level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuneRow {
    pub id: RuneId,
    pub options: Vec<StatModifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRow {
    pub id: CollectionId,
    pub effects: Vec<StatModifier>,
}
