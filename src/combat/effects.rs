//! Collection effects
//!
//! Activated collections grant additive modifiers. The sheet is authoritative,
//! but the ledger may carry ids newer than the local sheet; those are skipped.

use crate::sheets::{CollectionRow, Sheet};
use crate::state::{CollectionState, StatModifier};

/// Modifiers granted by a collection state.
///
/// Ordered by ascending collection id, then by row order, so two runs over
/// the same input log identical effect lists.
pub fn resolve_effects(collection: &CollectionState, sheet: &Sheet<CollectionRow>) -> Vec<StatModifier> {
    let mut effects = Vec::new();
    for id in &collection.ids {
        match sheet.get(*id) {
            Some(row) => effects.extend(row.effects.iter().copied()),
            None => tracing::debug!(collection_id = id, "collection id not in sheet, skipping"),
        }
    }
    effects
}
