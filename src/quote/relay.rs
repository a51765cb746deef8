//! Relay-style quote provider client

use super::{QuoteProvider, QuoteRequest};
use crate::config::QuoteProviderConfig;
use crate::error::{ConsolidatorError, ConsolidatorResult};
use crate::plan::QuoteResponse;

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the multi-input swap quote endpoint
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(config: &QuoteProviderConfig) -> ConsolidatorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ConsolidatorError::QuoteRequest(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteProvider for RelayClient {
    async fn fetch_quote(&self, request: &QuoteRequest) -> ConsolidatorResult<QuoteResponse> {
        let url = format!("{}/execute/swap/multi-input", self.base_url);

        debug!(origins = request.origins.len(), destination = request.destination_chain_id,
            "Requesting consolidation quote");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ConsolidatorError::QuoteRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Non-2xx is fatal for the whole request; there are no partial
            // quotes. Keep a body snippet for diagnostics.
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(ConsolidatorError::QuoteRequest(format!(
                "HTTP {status}: {snippet}"
            )));
        }

        response
            .json::<QuoteResponse>()
            .await
            .map_err(|e| ConsolidatorError::QuoteRequest(format!("Invalid response body: {e}")))
    }
}
