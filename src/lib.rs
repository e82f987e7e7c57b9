//! Battle Forecast - outcome statistics for ledger-backed combat
//!
//! Reads combatant state from a remote ledger, assembles it into resolver
//! input, runs many independently seeded trials and reports win rates and
//! stage-clear tiers. Nothing is ever written back to the ledger.

pub mod combat;
pub mod core;
pub mod digest;
pub mod gateway;
pub mod sheets;
pub mod simulation;
pub mod state;
