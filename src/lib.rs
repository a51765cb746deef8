//! Cross-chain USDC consolidation core
//!
//! Turns a user's balances scattered across several chains into a single
//! destination-chain holding: scan balances per chain, build one aggregated
//! multi-input swap request, compile the returned multi-step quote into an
//! ordered chain-tagged transaction plan, and execute that plan one
//! transaction at a time across chain switches.
//!
//! Wallet connectivity, balance discovery, and quote routing are external
//! collaborators consumed through the [`executor::WalletProvider`],
//! [`balances::BalanceProvider`], and [`quote::QuoteProvider`] seams; this
//! crate holds no keys and performs no on-chain settlement itself.

pub mod amounts;
pub mod balances;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod plan;
pub mod quote;

pub use balances::{BalanceProvider, BalanceScan, ChainEntry, GoldrushClient};
pub use config::Settings;
pub use coordinator::{ChainSelection, Consolidator};
pub use error::{ConsolidatorError, ConsolidatorResult};
pub use executor::{ExecutionPhase, Executor, WalletProvider};
pub use plan::{compile_plan, ExecutionPlan, TransactionRequest};
pub use quote::{build_quote_request, QuoteProvider, QuoteRequest, RelayClient};
