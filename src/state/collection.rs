use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::CollectionId;
use crate::gateway::EncodedState;

/// Activated collection bonuses of an avatar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionState {
    pub ids: BTreeSet<CollectionId>,
}

impl CollectionState {
    pub fn new(ids: impl IntoIterator<Item = CollectionId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Absent means no bonuses
    pub fn from_state(state: Option<EncodedState>) -> Result<Self> {
        match state {
            Some(state) => state.decode("collection state"),
            None => Ok(Self::default()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
