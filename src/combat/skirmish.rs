//! Reference combat resolver
//!
//! A small alternating-strike duel over effective stats. It stands in for the
//! host game's resolver when running offline or from the CLI; it makes no
//! claim to reproduce the host's numbers.

use rand::{Rng, RngCore};

use crate::combat::resolver::CombatResolver;
use crate::combat::stats::CombatStats;
use crate::core::config::ForecastConfig;
use crate::core::error::Result;
use crate::digest::CombatantDigest;
use crate::sheets::{StageRow, TableSheets};
use crate::state::{GameConfig, StatModifier};

/// Base hit chance in percent before the hit/speed comparison
const BASE_HIT_CHANCE: i64 = 70;
const MIN_HIT_CHANCE: i64 = 10;
const MAX_HIT_CHANCE: i64 = 95;

#[derive(Debug, Clone, Copy)]
pub struct SkirmishResolver {
    /// Turn cap per duel; reaching it is a loss for the challenger
    pub max_turns: u32,
    /// Arena fights multiply both sides' HP by this
    pub arena_hp_multiplier: i64,
}

impl Default for SkirmishResolver {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default())
    }
}

impl SkirmishResolver {
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            arena_hp_multiplier: config.arena_hp_multiplier,
        }
    }

    /// Damage of one strike, or 0 on a miss
    fn strike(attacker: &CombatStats, defender: &CombatStats, crit_cap: i64, rng: &mut dyn RngCore) -> i64 {
        let hit_chance =
            BASE_HIT_CHANCE
                .saturating_add(attacker.hit.saturating_sub(defender.hit) / 2)
                .clamp(MIN_HIT_CHANCE, MAX_HIT_CHANCE);
        if rng.gen_range(0..100) >= hit_chance {
            return 0;
        }

        let base = attacker.atk.saturating_sub(defender.def).max(1);
        let damage = (base.saturating_mul(rng.gen_range(90..=110)) / 100).max(1);
        if rng.gen_range(0..100) < attacker.cri {
            let critical = damage.saturating_mul(2);
            if crit_cap > 0 {
                critical.min(crit_cap)
            } else {
                critical
            }
        } else {
            damage
        }
    }

    /// Fight until one side drops. HP is carried in and out so waves can
    /// chain. Returns `true` when the challenger wins within the turn cap.
    fn duel(
        &self,
        challenger: &CombatStats,
        challenger_hp: &mut i64,
        defender: &CombatStats,
        defender_hp: &mut i64,
        crit_cap: i64,
        rng: &mut dyn RngCore,
    ) -> bool {
        let challenger_first = match challenger.spd.cmp(&defender.spd) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => rng.gen_bool(0.5),
        };

        for turn in 0..self.max_turns {
            let challenger_turn = (turn % 2 == 0) == challenger_first;
            if challenger_turn {
                *defender_hp = defender_hp.saturating_sub(Self::strike(challenger, defender, crit_cap, rng));
                if *defender_hp <= 0 {
                    return true;
                }
            } else {
                *challenger_hp = challenger_hp.saturating_sub(Self::strike(defender, challenger, crit_cap, rng));
                if *challenger_hp <= 0 {
                    return false;
                }
            }
        }
        false
    }
}

impl CombatResolver for SkirmishResolver {
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
        let mine = CombatStats::for_digest(me, sheets, my_effects)?;
        let theirs = CombatStats::for_digest(enemy, sheets, enemy_effects)?;
        let mut my_hp = mine.hp.saturating_mul(self.arena_hp_multiplier);
        let mut their_hp = theirs.hp.saturating_mul(self.arena_hp_multiplier);
        Ok(self.duel(
            &mine,
            &mut my_hp,
            &theirs,
            &mut their_hp,
            game_config.shatter_strike_max_damage,
            rng,
        ))
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
        let mine = CombatStats::for_digest(me, sheets, effects)?;
        let mut my_hp = mine.hp;
        let mut cleared = 0u8;

        for wave in &stage.waves {
            for enemy in &wave.enemies {
                let row = sheets.character(enemy.character_id)?;
                let monster = CombatStats::from_character(row, enemy.level);
                let mut monster_hp = monster.hp.max(1);
                let won = self.duel(
                    &mine,
                    &mut my_hp,
                    &monster,
                    &mut monster_hp,
                    game_config.shatter_strike_max_damage,
                    rng,
                );
                if !won {
                    return Ok(cleared);
                }
            }
            cleared = cleared.saturating_add(1);
        }
        Ok(cleared)
    }
}
