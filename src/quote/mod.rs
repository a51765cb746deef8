//! Multi-input swap quote request construction
//!
//! Turns the user's per-chain selections into the quote provider's request
//! shape. This is a pure transform; the only network activity lives behind
//! the [`QuoteProvider`] seam.

mod relay;

pub use relay::RelayClient;

use crate::config::Settings;
use crate::error::{ConsolidatorError, ConsolidatorResult};
use crate::plan::QuoteResponse;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::Serialize;

/// One selected (chain, amount) pair contributed to a consolidation
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedOrigin {
    pub chain_name: String,
    /// Base-unit amount, already truncated from the user's decimal entry
    pub amount_base: U256,
}

/// Wire shape of one origin leg
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub chain_id: u64,
    /// Asset contract address on the origin chain
    pub currency: String,
    /// Base-unit integer amount as a string
    pub amount: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum TradeType {
    #[serde(rename = "EXACT_INPUT")]
    ExactInput,
    #[serde(rename = "EXACT_OUTPUT")]
    ExactOutput,
}

/// Multi-input swap quote request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub user: String,
    /// Always equals `user`: the consolidated funds go back to the caller
    pub recipient: String,
    pub origins: Vec<Origin>,
    pub destination_currency: String,
    pub destination_chain_id: u64,
    pub trade_type: TradeType,
}

/// External quote/routing provider seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, request: &QuoteRequest) -> ConsolidatorResult<QuoteResponse>;
}

/// Build a quote request from the selected origins.
///
/// Fails with [`ConsolidatorError::NoSelection`] before any network call if
/// nothing is selected; chain names and the destination id must resolve
/// against the configured chain set.
pub fn build_quote_request(
    settings: &Settings,
    user: &str,
    destination_chain_id: u64,
    origins: &[SelectedOrigin],
) -> ConsolidatorResult<QuoteRequest> {
    if origins.is_empty() {
        return Err(ConsolidatorError::NoSelection);
    }

    let destination = settings
        .chain_by_id(destination_chain_id)
        .ok_or(ConsolidatorError::ChainNotFound {
            chain_id: destination_chain_id,
        })?;

    let origins = origins
        .iter()
        .map(|origin| {
            let chain = settings.chain_by_name(&origin.chain_name).ok_or_else(|| {
                ConsolidatorError::UnknownChain {
                    chain: origin.chain_name.clone(),
                }
            })?;
            Ok(Origin {
                chain_id: chain.chain_id,
                currency: chain.currency_address.clone(),
                amount: origin.amount_base.to_string(),
                user: user.to_string(),
            })
        })
        .collect::<ConsolidatorResult<Vec<_>>>()?;

    Ok(QuoteRequest {
        user: user.to_string(),
        recipient: user.to_string(),
        origins,
        destination_currency: destination.currency_address.clone(),
        destination_chain_id,
        trade_type: TradeType::ExactInput,
    })
}
