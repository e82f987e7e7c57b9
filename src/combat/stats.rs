//! Effective combat stats of a combatant
//!
//! Composition order: character base by level, then flat item stats, then
//! rune options and flat modifiers, then percentage modifiers on the result.

use crate::core::error::Result;
use crate::digest::CombatantDigest;
use crate::sheets::{CharacterRow, TableSheets};
use crate::state::{ModifyOperation, StatModifier, StatType, StatValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CombatStats {
    pub hp: i64,
    pub atk: i64,
    pub def: i64,
    pub spd: i64,
    pub cri: i64,
    pub hit: i64,
}

impl CombatStats {
    pub fn from_character(row: &CharacterRow, level: u32) -> Self {
        let growth = i64::from(level.saturating_sub(1));
        Self {
            hp: row.hp.saturating_add(row.lv_hp.saturating_mul(growth)),
            atk: row.atk.saturating_add(row.lv_atk.saturating_mul(growth)),
            def: row.def.saturating_add(row.lv_def.saturating_mul(growth)),
            spd: row.spd.saturating_add(row.lv_spd.saturating_mul(growth)),
            cri: row.cri,
            hit: row.hit,
        }
    }

    pub fn get(&self, stat: StatType) -> i64 {
        match stat {
            StatType::Hp => self.hp,
            StatType::Atk => self.atk,
            StatType::Def => self.def,
            StatType::Spd => self.spd,
            StatType::Cri => self.cri,
            StatType::Hit => self.hit,
        }
    }

    fn slot(&mut self, stat: StatType) -> &mut i64 {
        match stat {
            StatType::Hp => &mut self.hp,
            StatType::Atk => &mut self.atk,
            StatType::Def => &mut self.def,
            StatType::Spd => &mut self.spd,
            StatType::Cri => &mut self.cri,
            StatType::Hit => &mut self.hit,
        }
    }

    pub fn add_flat(&mut self, value: &StatValue) {
        let slot = self.slot(value.stat);
        *slot = slot.saturating_add(value.value);
    }

    /// Apply all `Add` modifiers, then all `Percentage` modifiers against the
    /// post-add values, so the result does not depend on modifier order.
    /// Stats saturate at the i64 bounds instead of wrapping.
    pub fn apply_modifiers(&mut self, modifiers: &[StatModifier]) {
        for m in modifiers.iter().filter(|m| m.operation == ModifyOperation::Add) {
            let slot = self.slot(m.stat);
            *slot = slot.saturating_add(m.value);
        }
        let base = *self;
        for m in modifiers.iter().filter(|m| m.operation == ModifyOperation::Percentage) {
            let bonus = base.get(m.stat).saturating_mul(m.value) / 100;
            let slot = self.slot(m.stat);
            *slot = slot.saturating_add(bonus);
        }
    }

    /// Stats of a digest with its collection effects applied
    pub fn for_digest(
        digest: &CombatantDigest,
        sheets: &TableSheets,
        effects: &[StatModifier],
    ) -> Result<Self> {
        let row = sheets.character(digest.character_id)?;
        let mut stats = Self::from_character(row, digest.level);

        for value in digest.equipments.iter().flat_map(|e| e.stats.iter()) {
            stats.add_flat(value);
        }
        for value in digest.costumes.iter().flat_map(|c| c.stats.iter()) {
            stats.add_flat(value);
        }

        let mut modifiers: Vec<StatModifier> = Vec::new();
        for rune in &digest.runes {
            match sheets.rune(rune.rune_id) {
                Some(row) => modifiers.extend(row.options.iter().map(|o| o.scaled(i64::from(rune.level)))),
                None => tracing::debug!(rune_id = rune.rune_id, "rune not in sheet, skipping"),
            }
        }
        modifiers.extend_from_slice(effects);
        stats.apply_modifiers(&modifiers);

        stats.hp = stats.hp.max(1);
        Ok(stats)
    }
}
