//! HTTP client for a ledger state endpoint
//!
//! Wire shape:
//! - `GET {base}/tip` returns `{"index": <u64>}`
//! - `POST {base}/states` with `{"account", "addresses", "block_index"}`
//!   returns `{"values": [...]}`, one entry per requested address in request
//!   order, `null` meaning absent.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::config::ForecastConfig;
use crate::core::error::{ForecastError, Result};
use crate::core::types::{Address, ChainSnapshot};
use crate::gateway::{Account, EncodedState, StateGateway, StateMap};

/// Async HTTP gateway to a ledger node
pub struct HttpGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    /// Create a gateway against `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForecastError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ForecastConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.fetch_timeout())
    }

    /// Create a gateway from environment variables
    ///
    /// Required: LEDGER_ENDPOINT
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("LEDGER_ENDPOINT")
            .map_err(|_| ForecastError::Config("LEDGER_ENDPOINT not set".into()))?;
        Self::new(endpoint, ForecastConfig::default().fetch_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, e: reqwest::Error) -> ForecastError {
        if e.is_timeout() {
            ForecastError::FetchTimeout { after: self.timeout }
        } else {
            ForecastError::Transport(e.to_string())
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ForecastError::Transport(format!("{}: {}", status, error_text)));
        }
        response.json().await.map_err(|e| self.classify(e))
    }
}

impl StateGateway for HttpGateway {
    async fn tip(&self) -> Result<ChainSnapshot> {
        let response = self
            .client
            .get(format!("{}/tip", self.base_url))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let tip: TipResponse = self.read_json(response).await?;
        Ok(ChainSnapshot(tip.index))
    }

    async fn fetch_bulk(
        &self,
        account: Account,
        addresses: &[Address],
        at: ChainSnapshot,
    ) -> Result<StateMap> {
        if addresses.is_empty() {
            return Ok(StateMap::default());
        }

        let request = StatesRequest {
            account,
            addresses,
            block_index: at.0,
        };
        let response = self
            .client
            .post(format!("{}/states", self.base_url))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let body: StatesResponse = self.read_json(response).await?;

        if body.values.len() != addresses.len() {
            return Err(ForecastError::Transport(format!(
                "expected {} values, node returned {}",
                addresses.len(),
                body.values.len()
            )));
        }

        Ok(addresses
            .iter()
            .copied()
            .zip(body.values.into_iter().map(|v| v.map(EncodedState)))
            .collect())
    }
}

#[derive(Serialize)]
struct StatesRequest<'a> {
    account: Account,
    addresses: &'a [Address],
    block_index: u64,
}

#[derive(Deserialize)]
struct StatesResponse {
    values: Vec<Option<serde_json::Value>>,
}

#[derive(Deserialize)]
struct TipResponse {
    index: u64,
}
