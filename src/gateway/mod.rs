//! Remote state gateway
//!
//! Read-only point and bulk lookups against the ledger's key/value state
//! store. A lookup yields `Some(encoded)` or `None` for "absent"; the two are
//! never conflated, because downstream defaulting only applies to a confirmed
//! absence. A failure of the whole call is an error, never a default.

pub mod http;
pub mod memory;
pub mod timeout;

use std::future::Future;

use ahash::AHashMap;
use derive_more::Display;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::error::{ForecastError, Result};
use crate::core::types::{Address, ChainSnapshot};

pub use http::HttpGateway;
pub use memory::MemoryGateway;
pub use timeout::TimeoutGateway;

/// Account scope a state key lives under
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    /// Slot records, rune states and global config
    Legacy,
    /// Avatar base states, keyed by avatar address
    Avatar,
    /// Collection states, keyed by avatar address
    Collection,
}

/// A raw state value as stored on the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedState(pub serde_json::Value);

impl EncodedState {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Encode a typed record
    pub fn encode<T: Serialize>(record: &T) -> Result<Self> {
        Ok(Self(serde_json::to_value(record)?))
    }

    /// Decode into a typed record; `what` names the record kind in errors
    pub fn decode<T: DeserializeOwned>(&self, what: &'static str) -> Result<T> {
        T::deserialize(&self.0).map_err(|e| ForecastError::decode(what, e))
    }
}

/// Result of a bulk lookup: every requested address maps to its value or
/// to `None` when absent
pub type StateMap = AHashMap<Address, Option<EncodedState>>;

/// Read access to ledger state.
///
/// All reads take the snapshot they must observe, so callers can pin a set of
/// lookups to one logical point in time.
pub trait StateGateway: Send + Sync {
    /// Current tip of the chain
    fn tip(&self) -> impl Future<Output = Result<ChainSnapshot>> + Send;

    /// Look up many addresses under one account.
    ///
    /// Absence of any single address is reported per entry, not as an error.
    fn fetch_bulk(
        &self,
        account: Account,
        addresses: &[Address],
        at: ChainSnapshot,
    ) -> impl Future<Output = Result<StateMap>> + Send;

    /// Look up a single address
    fn fetch_one(
        &self,
        account: Account,
        address: Address,
        at: ChainSnapshot,
    ) -> impl Future<Output = Result<Option<EncodedState>>> + Send {
        async move {
            let mut states = self.fetch_bulk(account, &[address], at).await?;
            Ok(states.remove(&address).flatten())
        }
    }
}
