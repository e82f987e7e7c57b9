//! Avatar base state and inventory items

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::core::error::{ForecastError, Result};
use crate::core::types::{Address, CharacterId, ItemId};
use crate::gateway::EncodedState;
use crate::state::stats::StatValue;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementalType {
    Normal,
    Fire,
    Water,
    Land,
    Wind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: ItemId,
    pub sheet_id: u32,
    pub grade: u8,
    pub level: u8,
    pub elemental_type: ElementalType,
    pub stats: Vec<StatValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Costume {
    pub id: ItemId,
    pub sheet_id: u32,
    #[serde(default)]
    pub stats: Vec<StatValue>,
}

/// A non-fungible inventory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Equipment(Equipment),
    Costume(Costume),
}

impl Item {
    pub fn id(&self) -> ItemId {
        match self {
            Item::Equipment(e) => e.id,
            Item::Costume(c) => c.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    pub address: Address,
    pub name: String,
    pub level: u32,
    pub character_id: CharacterId,
    #[serde(default)]
    pub inventory: Vec<Item>,
}

impl AvatarState {
    /// Decode a fetched avatar; absence is fatal for a simulation request
    pub fn from_state(address: Address, state: Option<EncodedState>) -> Result<Self> {
        match state {
            Some(state) => state.decode("avatar state"),
            None => Err(ForecastError::AvatarNotFound(address)),
        }
    }

    pub fn equipment(&self, id: ItemId) -> Option<&Equipment> {
        self.inventory.iter().find_map(|item| match item {
            Item::Equipment(e) if e.id == id => Some(e),
            _ => None,
        })
    }

    pub fn costume(&self, id: ItemId) -> Option<&Costume> {
        self.inventory.iter().find_map(|item| match item {
            Item::Costume(c) if c.id == id => Some(c),
            _ => None,
        })
    }
}
