//! Configuration management for the consolidation core
//!
//! Loads configuration from TOML files with environment variable substitution.
//! A `Default` implementation carries the five production chains so embedders
//! can run without a config file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub asset: AssetConfig,
    pub chains: BTreeMap<String, ChainConfig>,
    pub balances: BalanceProviderConfig,
    pub quote: QuoteProviderConfig,
    pub executor: ExecutorConfig,
}

/// The asset being consolidated
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    /// Token ticker symbol, matched case-insensitively against balance data
    pub symbol: String,
    /// Base-unit decimal exponent (6 for USDC)
    pub decimals: u32,
    /// USD quote values at or below this are treated as dust and dropped
    pub dust_threshold_usd: String,
}

/// One supported origin/destination chain, keyed by canonical chain name
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Contract address of the consolidated asset on this chain
    pub currency_address: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceProviderConfig {
    pub base_url: String,
    /// Name of the environment variable holding the provider API key
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    pub default_destination_chain_id: u64,
    /// Grace period after a chain switch before the wallet's execution
    /// context is reliable
    pub chain_switch_settle_ms: u64,
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("VACUUM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled_chains().next().is_none() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (name, chain) in &self.chains {
            if chain.enabled && chain.currency_address.is_empty() {
                anyhow::bail!("Chain {} has no currency address configured", name);
            }
        }

        if self
            .chain_by_id(self.executor.default_destination_chain_id)
            .is_none()
        {
            anyhow::bail!(
                "Default destination chain {} is not configured",
                self.executor.default_destination_chain_id
            );
        }

        if self.asset.symbol.is_empty() {
            anyhow::bail!("Asset symbol must not be empty");
        }

        Ok(())
    }

    /// Iterate enabled chains in canonical name order
    pub fn enabled_chains(&self) -> impl Iterator<Item = (&String, &ChainConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled)
    }

    /// Get chain config by canonical name
    pub fn chain_by_name(&self, name: &str) -> Option<&ChainConfig> {
        self.chains.get(name).filter(|c| c.enabled)
    }

    /// Get chain config by chain ID
    pub fn chain_by_id(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains
            .values()
            .find(|c| c.enabled && c.chain_id == chain_id)
    }
}

impl Default for Settings {
    fn default() -> Self {
        let mut chains = BTreeMap::new();
        chains.insert(
            "eth-mainnet".to_string(),
            ChainConfig {
                chain_id: 1,
                currency_address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
                enabled: true,
            },
        );
        chains.insert(
            "matic-mainnet".to_string(),
            ChainConfig {
                chain_id: 137,
                currency_address: "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359".to_string(),
                enabled: true,
            },
        );
        chains.insert(
            "optimism-mainnet".to_string(),
            ChainConfig {
                chain_id: 10,
                currency_address: "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85".to_string(),
                enabled: true,
            },
        );
        chains.insert(
            "arbitrum-mainnet".to_string(),
            ChainConfig {
                chain_id: 42161,
                currency_address: "0xaf88d065e77c8cC2239327C5EDb3A432268e5831".to_string(),
                enabled: true,
            },
        );
        chains.insert(
            "base-mainnet".to_string(),
            ChainConfig {
                chain_id: 8453,
                currency_address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
                enabled: true,
            },
        );

        Self {
            asset: AssetConfig {
                symbol: "USDC".to_string(),
                decimals: 6,
                dust_threshold_usd: "0.01".to_string(),
            },
            chains,
            balances: BalanceProviderConfig {
                base_url: "https://api.covalenthq.com".to_string(),
                api_key_env: "GOLDRUSH_API_KEY".to_string(),
            },
            quote: QuoteProviderConfig {
                base_url: "https://api.relay.link".to_string(),
            },
            executor: ExecutorConfig {
                default_destination_chain_id: 8453,
                chain_switch_settle_ms: 1000,
            },
        }
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
