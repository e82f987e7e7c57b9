//! Stat vocabulary shared by items, runes and collection effects

use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatType {
    Hp,
    Atk,
    Def,
    Spd,
    /// Critical chance, in percent
    Cri,
    /// Hit rating
    Hit,
}

/// A flat stat carried by an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatValue {
    pub stat: StatType,
    pub value: i64,
}

impl StatValue {
    pub fn new(stat: StatType, value: i64) -> Self {
        Self { stat, value }
    }
}

/// How a modifier combines with the stat it targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyOperation {
    /// Added to the stat after all flat sources
    Add,
    /// Percentage of the stat (after flat sources) added on top
    Percentage,
}

/// An additive combat modifier (collection effect, rune option)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: StatType,
    pub operation: ModifyOperation,
    pub value: i64,
}

impl StatModifier {
    pub fn add(stat: StatType, value: i64) -> Self {
        Self {
            stat,
            operation: ModifyOperation::Add,
            value,
        }
    }

    pub fn percentage(stat: StatType, value: i64) -> Self {
        Self {
            stat,
            operation: ModifyOperation::Percentage,
            value,
        }
    }

    /// Same modifier with its value multiplied (rune levels scale options)
    pub fn scaled(&self, factor: i64) -> Self {
        Self {
            value: self.value.saturating_mul(factor),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_type_wire_names() {
        assert_eq!(serde_json::to_string(&StatType::Hp).unwrap(), "\"HP\"");
        assert_eq!(serde_json::to_string(&StatType::Cri).unwrap(), "\"CRI\"");
    }

    #[test]
    fn test_scaled_keeps_stat_and_operation() {
        let m = StatModifier::percentage(StatType::Atk, 3).scaled(4);
        assert_eq!(m, StatModifier::percentage(StatType::Atk, 12));
    }

    #[test]
    fn test_scaled_saturates() {
        let m = StatModifier::add(StatType::Hp, i64::MAX / 3).scaled(30);
        assert_eq!(m.value, i64::MAX);
    }
}
