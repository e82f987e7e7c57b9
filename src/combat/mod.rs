//! Combat inputs and the resolver seam
//!
//! Effects and effective stats are computed here; the fight itself belongs to
//! whichever `CombatResolver` the caller supplies.

pub mod effects;
pub mod resolver;
pub mod skirmish;
pub mod stats;

pub use effects::resolve_effects;
pub use resolver::{CombatResolver, Opponent, TrialInput, TrialOutcome};
pub use skirmish::SkirmishResolver;
pub use stats::CombatStats;
