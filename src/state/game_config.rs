use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::gateway::EncodedState;

/// Global tunables stored on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Upper bound on the damage of a single critical strike
    pub shatter_strike_max_damage: i64,
}

impl GameConfig {
    /// Unlike other records there is no default: `None` is passed through so
    /// the caller can report the anomaly and pick a fallback.
    pub fn from_state(state: Option<EncodedState>) -> Result<Option<Self>> {
        state.map(|s| s.decode("game config")).transpose()
    }
}
