//! In-memory ledger state
//!
//! Holds a single version of state; every snapshot observes the same values.
//! Used for offline runs and tests, with hooks to inject a transport failure
//! or a call that never completes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use ahash::AHashMap;
use serde::Serialize;

use crate::core::error::{ForecastError, Result};
use crate::core::types::{Address, ChainSnapshot};
use crate::gateway::{Account, EncodedState, StateGateway, StateMap};

#[derive(Default)]
pub struct MemoryGateway {
    states: RwLock<AHashMap<(Account, Address), EncodedState>>,
    tip: AtomicU64,
    fetched: Mutex<Vec<(Account, Address, ChainSnapshot)>>,
    failure: RwLock<Option<String>>,
    stalled: AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a typed record under (account, address)
    pub fn insert<T: Serialize>(&self, account: Account, address: Address, record: &T) -> Result<()> {
        self.insert_raw(account, address, EncodedState::encode(record)?);
        Ok(())
    }

    pub fn insert_raw(&self, account: Account, address: Address, state: EncodedState) {
        if let Ok(mut states) = self.states.write() {
            states.insert((account, address), state);
        }
    }

    pub fn remove(&self, account: Account, address: Address) {
        if let Ok(mut states) = self.states.write() {
            states.remove(&(account, address));
        }
    }

    pub fn set_tip(&self, tip: u64) {
        self.tip.store(tip, Ordering::SeqCst);
    }

    /// Make every following call fail with a transport error
    pub fn fail_with(&self, reason: impl Into<String>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = Some(reason.into());
        }
    }

    /// Make every following call suspend forever
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    /// Every (account, address, snapshot) looked up so far, in call order
    pub fn fetch_log(&self) -> Vec<(Account, Address, ChainSnapshot)> {
        self.fetched.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().map(|log| log.len()).unwrap_or(0)
    }

    async fn check_health(&self) -> Result<()> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let failure = self
            .failure
            .read()
            .map_err(|e| ForecastError::Transport(e.to_string()))?
            .clone();
        match failure {
            Some(reason) => Err(ForecastError::Transport(reason)),
            None => Ok(()),
        }
    }
}

impl StateGateway for MemoryGateway {
    async fn tip(&self) -> Result<ChainSnapshot> {
        self.check_health().await?;
        Ok(ChainSnapshot(self.tip.load(Ordering::SeqCst)))
    }

    async fn fetch_bulk(
        &self,
        account: Account,
        addresses: &[Address],
        at: ChainSnapshot,
    ) -> Result<StateMap> {
        self.check_health().await?;

        if let Ok(mut log) = self.fetched.lock() {
            log.extend(addresses.iter().map(|address| (account, *address, at)));
        }

        let states = self
            .states
            .read()
            .map_err(|e| ForecastError::Transport(e.to_string()))?;
        Ok(addresses
            .iter()
            .map(|address| (*address, states.get(&(account, *address)).cloned()))
            .collect())
    }
}
