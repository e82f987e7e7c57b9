//! Bounded-wait wrapper for any gateway

use std::time::Duration;

use crate::core::error::{ForecastError, Result};
use crate::core::types::{Address, ChainSnapshot};
use crate::gateway::{Account, StateGateway, StateMap};

/// Fails any call that does not complete within `limit` with `FetchTimeout`
pub struct TimeoutGateway<G> {
    inner: G,
    limit: Duration,
}

impl<G: StateGateway> TimeoutGateway<G> {
    pub fn new(inner: G, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl<G: StateGateway> StateGateway for TimeoutGateway<G> {
    async fn tip(&self) -> Result<ChainSnapshot> {
        tokio::time::timeout(self.limit, self.inner.tip())
            .await
            .map_err(|_| ForecastError::FetchTimeout { after: self.limit })?
    }

    async fn fetch_bulk(
        &self,
        account: Account,
        addresses: &[Address],
        at: ChainSnapshot,
    ) -> Result<StateMap> {
        tokio::time::timeout(self.limit, self.inner.fetch_bulk(account, addresses, at))
            .await
            .map_err(|_| ForecastError::FetchTimeout { after: self.limit })?
    }
}
