//! The combat resolver seam
//!
//! The host game's turn-by-turn combat is a black box to this crate: a
//! deterministic function of the assembled input and a random source.
//! Implementations must not keep random state between calls; every trial
//! hands in its own generator.

use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::digest::CombatantDigest;
use crate::sheets::{StageRow, TableSheets};
use crate::state::{GameConfig, StatModifier};

/// Who the local combatant fights
#[derive(Debug, Clone)]
pub enum Opponent {
    Avatar {
        digest: CombatantDigest,
        effects: Vec<StatModifier>,
    },
    Stage(StageRow),
}

/// Everything one trial needs, assembled once per batch
#[derive(Debug, Clone)]
pub struct TrialInput {
    pub me: CombatantDigest,
    pub my_effects: Vec<StatModifier>,
    pub opponent: Opponent,
    pub sheets: Arc<TableSheets>,
    pub game_config: GameConfig,
}

impl TrialInput {
    /// Highest tier a stage trial can reach (wave count); 1 for arena trials
    pub fn max_tier(&self) -> u8 {
        match &self.opponent {
            Opponent::Avatar { .. } => 1,
            Opponent::Stage(stage) => u8::try_from(stage.waves.len()).unwrap_or(u8::MAX),
        }
    }

    pub fn is_arena(&self) -> bool {
        matches!(self.opponent, Opponent::Avatar { .. })
    }
}

/// Outcome of a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialOutcome {
    Arena { win: bool },
    /// 0 is a failure; k means the first k waves were cleared
    Stage { tier: u8 },
}

pub trait CombatResolver: Send + Sync {
    /// Fight `me` against another avatar; `true` when `me` wins
    #[allow(clippy::too_many_arguments)]
    fn resolve_arena(
        &self,
        me: &CombatantDigest,
        enemy: &CombatantDigest,
        sheets: &TableSheets,
        my_effects: &[StatModifier],
        enemy_effects: &[StatModifier],
        game_config: &GameConfig,
        rng: &mut dyn RngCore,
    ) -> Result<bool>;

    /// Play `stage` with `me`; returns the tier reached
    fn resolve_stage(
        &self,
        me: &CombatantDigest,
        stage: &StageRow,
        sheets: &TableSheets,
        effects: &[StatModifier],
        game_config: &GameConfig,
        rng: &mut dyn RngCore,
    ) -> Result<u8>;
}

impl<R: CombatResolver + ?Sized> CombatResolver for Arc<R> {
    #[allow(clippy::too_many_arguments)]
    fn resolve_arena(
        &self,
        me: &CombatantDigest,
        enemy: &CombatantDigest,
        sheets: &TableSheets,
        my_effects: &[StatModifier],
        enemy_effects: &[StatModifier],
        game_config: &GameConfig,
        rng: &mut dyn RngCore,
    ) -> Result<bool> {
        (**self).resolve_arena(me, enemy, sheets, my_effects, enemy_effects, game_config, rng)
    }

    fn resolve_stage(
        &self,
        me: &CombatantDigest,
        stage: &StageRow,
        sheets: &TableSheets,
        effects: &[StatModifier],
        game_config: &GameConfig,
        rng: &mut dyn RngCore,
    ) -> Result<u8> {
        (**self).resolve_stage(me, stage, sheets, effects, game_config, rng)
    }
}
