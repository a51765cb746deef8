//! Error types for the consolidation core

use thiserror::Error;

/// Main error type for the consolidator
#[derive(Error, Debug)]
pub enum ConsolidatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown chain: {chain}")]
    UnknownChain { chain: String },

    #[error("Chain {chain_id} not found in configuration")]
    ChainNotFound { chain_id: u64 },

    #[error("Balance scan failed: {0}")]
    BalanceScan(String),

    #[error("Balance fetch failed for {chain}: {message}")]
    BalanceFetch { chain: String, message: String },

    #[error("Invalid selection for {chain}: {message}")]
    Selection { chain: String, message: String },

    #[error("No chains selected for consolidation")]
    NoSelection,

    #[error("No wallet address available")]
    NoAddress,

    #[error("No execution plan available")]
    NoPlan,

    #[error("Quote request failed: {0}")]
    QuoteRequest(String),

    #[error("Quote contains no steps")]
    EmptyQuote,

    #[error("Malformed quote step {index}: {message}")]
    MalformedStep { index: usize, message: String },

    #[error("Chain switch to {chain_id} failed: {message}")]
    ChainSwitch { chain_id: u64, message: String },

    #[error("Transaction {index} submission failed: {message}")]
    Submission { index: usize, message: String },

    #[error("Execution plan already complete")]
    ExecutionComplete,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsolidatorError {
    /// Check if error is retryable
    ///
    /// Step-level execution errors leave the cursor unmoved, so re-invoking
    /// the failed operation retries the same step from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConsolidatorError::QuoteRequest(_)
                | ConsolidatorError::ChainSwitch { .. }
                | ConsolidatorError::Submission { .. }
        )
    }
}

/// Result type for consolidator operations
pub type ConsolidatorResult<T> = Result<T, ConsolidatorError>;
