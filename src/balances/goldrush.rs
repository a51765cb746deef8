//! GoldRush-style balance provider client

use super::{BalanceProvider, TokenBalance};
use crate::config::BalanceProviderConfig;
use crate::error::{ConsolidatorError, ConsolidatorResult};

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the balance provider REST API
pub struct GoldrushClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    data: Option<BalancesData>,
    #[serde(default)]
    error: bool,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalancesData {
    #[serde(default)]
    items: Vec<TokenBalance>,
}

impl GoldrushClient {
    /// Create a client from configuration.
    ///
    /// Missing credentials fail here, before any fan-out starts: that is a
    /// whole-scan failure, not a per-chain one.
    pub fn new(config: &BalanceProviderConfig) -> ConsolidatorResult<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ConsolidatorError::BalanceScan(format!(
                "Balance provider credentials missing: {} is not set",
                config.api_key_env
            ))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConsolidatorError::BalanceScan(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl BalanceProvider for GoldrushClient {
    async fn token_balances(
        &self,
        chain_name: &str,
        address: &str,
    ) -> ConsolidatorResult<Vec<TokenBalance>> {
        let url = format!(
            "{}/v1/{}/address/{}/balances_v2/",
            self.base_url, chain_name, address
        );

        debug!(chain = chain_name, "Fetching token balances");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("quote-currency", "USD")])
            .send()
            .await
            .map_err(|e| ConsolidatorError::BalanceFetch {
                chain: chain_name.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConsolidatorError::BalanceFetch {
                chain: chain_name.to_string(),
                message: format!("HTTP {status}"),
            });
        }

        let body: BalancesResponse =
            response
                .json()
                .await
                .map_err(|e| ConsolidatorError::BalanceFetch {
                    chain: chain_name.to_string(),
                    message: format!("Invalid response body: {e}"),
                })?;

        if body.error {
            return Err(ConsolidatorError::BalanceFetch {
                chain: chain_name.to_string(),
                message: body
                    .error_message
                    .unwrap_or_else(|| "Provider reported an error".to_string()),
            });
        }

        Ok(body.data.map(|d| d.items).unwrap_or_default())
    }
}
