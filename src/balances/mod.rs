//! Multi-chain balance discovery
//!
//! Fans out one balance query per enabled chain, isolates per-chain failure
//! behind an error entry instead of aborting the scan, and filters the result
//! down to the configured asset above the dust threshold.

mod goldrush;

pub use goldrush::GoldrushClient;

use crate::config::Settings;
use crate::error::{ConsolidatorError, ConsolidatorResult};

use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, warn};

/// One token balance row as returned by the balance provider.
///
/// Every field is optional on the wire; filtering discards rows that are
/// missing what we need rather than failing the chain.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBalance {
    pub contract_ticker_symbol: Option<String>,
    pub contract_address: Option<String>,
    pub contract_decimals: Option<u32>,
    /// Base-unit balance as an integer string
    pub balance: Option<String>,
    /// USD quote for the full balance
    pub quote: Option<f64>,
}

/// Per-chain scan result: either qualifying balances or a captured error
#[derive(Debug, Clone)]
pub struct ChainEntry {
    pub chain_name: String,
    pub items: Vec<TokenBalance>,
    pub has_error: bool,
    pub error_message: Option<String>,
}

/// Aggregated scan across all enabled chains.
///
/// Only chains with a qualifying balance or an error appear; chains with
/// nothing to show are dropped entirely.
#[derive(Debug, Clone, Default)]
pub struct BalanceScan {
    pub items: Vec<ChainEntry>,
}

/// External balance provider seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Fetch all token balances for an address on one chain
    async fn token_balances(
        &self,
        chain_name: &str,
        address: &str,
    ) -> ConsolidatorResult<Vec<TokenBalance>>;
}

/// Scan all enabled chains concurrently for the configured asset.
///
/// A failure on one chain produces an error entry for that chain without
/// failing the others. A failure of the mechanism itself (no enabled chains,
/// unparsable dust threshold) aborts the whole scan.
pub async fn scan_balances(
    provider: &dyn BalanceProvider,
    settings: &Settings,
    address: &str,
) -> ConsolidatorResult<BalanceScan> {
    let dust_threshold = Decimal::from_str(&settings.asset.dust_threshold_usd).map_err(|e| {
        ConsolidatorError::Config(format!(
            "Invalid dust threshold {:?}: {e}",
            settings.asset.dust_threshold_usd
        ))
    })?;

    let chains: Vec<&String> = settings.enabled_chains().map(|(name, _)| name).collect();
    if chains.is_empty() {
        return Err(ConsolidatorError::BalanceScan(
            "No enabled chains to scan".to_string(),
        ));
    }

    let fetches = chains
        .into_iter()
        .map(|chain_name| async move {
            let result = provider.token_balances(chain_name, address).await;
            (chain_name.as_str(), result)
        })
        .collect::<Vec<_>>();

    let mut items = Vec::new();
    for (chain_name, result) in join_all(fetches).await {
        match result {
            Ok(tokens) => {
                let filtered: Vec<TokenBalance> = tokens
                    .into_iter()
                    .filter(|t| qualifies(t, &settings.asset.symbol, dust_threshold))
                    .collect();

                debug!(
                    chain = chain_name,
                    matches = filtered.len(),
                    "Chain scan complete"
                );

                if !filtered.is_empty() {
                    items.push(ChainEntry {
                        chain_name: chain_name.to_string(),
                        items: filtered,
                        has_error: false,
                        error_message: None,
                    });
                }
            }
            Err(e) => {
                warn!(chain = chain_name, error = %e, "Chain balance fetch failed");
                crate::metrics::record_chain_scan_error(chain_name);
                items.push(ChainEntry {
                    chain_name: chain_name.to_string(),
                    items: Vec::new(),
                    has_error: true,
                    error_message: Some(e.to_string()),
                });
            }
        }
    }

    crate::metrics::record_balance_scan();
    Ok(BalanceScan { items })
}

/// A token qualifies if it is the configured asset and carries a USD quote
/// strictly above the dust threshold
fn qualifies(token: &TokenBalance, symbol: &str, dust_threshold: Decimal) -> bool {
    let symbol_matches = token
        .contract_ticker_symbol
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case(symbol));

    let quote_above_dust = token
        .quote
        .and_then(Decimal::from_f64)
        .is_some_and(|q| q > dust_threshold);

    symbol_matches && quote_above_dust
}
