//! Static rule tables
//!
//! Loaded once per process from TOML and shared read-only (`Arc<TableSheets>`)
//! by every simulation.

pub mod rows;

use std::path::Path;

use ahash::AHashMap;
use serde::Deserialize;

use crate::core::error::{ForecastError, Result};
use crate::core::types::{CharacterId, CollectionId, RuneId, StageId};

pub use rows::{CharacterRow, CollectionRow, EnemyRow, RuneRow, StageRow, WaveRow};

/// Rows keyed by integer id, remembering load order
#[derive(Debug, Clone)]
pub struct Sheet<R> {
    rows: AHashMap<u32, R>,
    order: Vec<u32>,
}

impl<R> Default for Sheet<R> {
    fn default() -> Self {
        Self {
            rows: AHashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<R> Sheet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row; ids must be unique within a sheet
    pub fn insert(&mut self, id: u32, row: R) -> Result<()> {
        if self.rows.contains_key(&id) {
            return Err(ForecastError::Sheet(format!("duplicate row id {}", id)));
        }
        self.rows.insert(id, row);
        self.order.push(id);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&R> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.rows.contains_key(&id)
    }

    /// Ids in load order
    pub fn keys(&self) -> &[u32] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.order.iter().filter_map(|id| self.rows.get(id))
    }
}

/// Every table a simulation reads
#[derive(Debug, Clone, Default)]
pub struct TableSheets {
    pub characters: Sheet<CharacterRow>,
    pub stages: Sheet<StageRow>,
    pub runes: Sheet<RuneRow>,
    pub collections: Sheet<CollectionRow>,
}

impl TableSheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn character(&self, id: CharacterId) -> Result<&CharacterRow> {
        self.characters.get(id).ok_or(ForecastError::UnknownCharacter(id))
    }

    pub fn stage(&self, id: StageId) -> Result<&StageRow> {
        self.stages.get(id).ok_or(ForecastError::UnknownStage(id))
    }

    pub fn rune(&self, id: RuneId) -> Option<&RuneRow> {
        self.runes.get(id)
    }

    pub fn collection(&self, id: CollectionId) -> Option<&CollectionRow> {
        self.collections.get(id)
    }

    /// Load sheets from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse sheets from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let toml_data: TomlSheets = toml::from_str(content)?;

        let mut sheets = Self::new();
        for row in toml_data.characters {
            sheets.characters.insert(row.id, row)?;
        }
        for row in toml_data.stages {
            sheets.stages.insert(row.id, row)?;
        }
        for row in toml_data.runes {
            sheets.runes.insert(row.id, row)?;
        }
        for row in toml_data.collections {
            sheets.collections.insert(row.id, row)?;
        }
        sheets.validate()?;
        Ok(sheets)
    }

    /// Every stage needs at least one wave, and every stage enemy must
    /// reference a known character
    pub fn validate(&self) -> Result<()> {
        for stage in self.stages.iter() {
            if stage.waves.is_empty() {
                return Err(ForecastError::Sheet(format!("stage {} has no waves", stage.id)));
            }
            for enemy in stage.waves.iter().flat_map(|w| w.enemies.iter()) {
                if !self.characters.contains(enemy.character_id) {
                    return Err(ForecastError::Sheet(format!(
                        "stage {} references unknown character {}",
                        stage.id, enemy.character_id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// TOML representation of the sheets file
#[derive(Debug, Deserialize)]
struct TomlSheets {
    #[serde(default)]
    characters: Vec<CharacterRow>,
    #[serde(default)]
    stages: Vec<StageRow>,
    #[serde(default)]
    runes: Vec<RuneRow>,
    #[serde(default)]
    collections: Vec<CollectionRow>,
}
