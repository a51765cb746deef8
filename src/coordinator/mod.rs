//! Consolidation coordinator
//!
//! Thin stateful composition over balance discovery, quote construction,
//! plan compilation, and execution. Holds the user's per-chain selections in
//! a map keyed by chain name (never by position), aggregates component errors
//! into one surfaced value, and exposes the derived totals the embedding UI
//! renders.

use crate::amounts;
use crate::balances::{scan_balances, BalanceProvider, BalanceScan};
use crate::config::Settings;
use crate::error::{ConsolidatorError, ConsolidatorResult};
use crate::executor::{ExecutionPhase, Executor, WalletProvider};
use crate::plan::{compile_plan, ExecutionPlan};
use crate::quote::{build_quote_request, QuoteProvider, SelectedOrigin};

use alloy_primitives::U256;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// One chain's selection state: how much is available and how much the user
/// chose to consolidate from it
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSelection {
    pub chain_name: String,
    /// Available balance in base units; set once per scan
    pub max_amount: U256,
    /// Human-entered decimal amount; empty or zero means unselected
    pub amount: String,
    pub selected: bool,
    /// USD quote for the full `max_amount`, used only to prorate
    pub usd_value: Decimal,
}

/// Stateful consolidation API consumed by the embedding wizard.
///
/// All mutation happens through `&mut self` in response to discrete user
/// events; no two operations are ever in flight concurrently.
pub struct Consolidator {
    settings: Settings,
    balances: Arc<dyn BalanceProvider>,
    quotes: Arc<dyn QuoteProvider>,
    wallet: Arc<dyn WalletProvider>,

    address: Option<String>,
    scan: Option<BalanceScan>,
    selections: BTreeMap<String, ChainSelection>,
    destination_chain_id: u64,
    executor: Option<Executor>,
    error: Option<String>,
}

impl Consolidator {
    pub fn new(
        settings: Settings,
        balances: Arc<dyn BalanceProvider>,
        quotes: Arc<dyn QuoteProvider>,
        wallet: Arc<dyn WalletProvider>,
    ) -> Self {
        let destination_chain_id = settings.executor.default_destination_chain_id;
        Self {
            settings,
            balances,
            quotes,
            wallet,
            address: None,
            scan: None,
            selections: BTreeMap::new(),
            destination_chain_id,
            executor: None,
            error: None,
        }
    }

    // -----------------------------------------------------------------------
    // Balance scan
    // -----------------------------------------------------------------------

    /// Scan all enabled chains for the user's balances and rebuild the
    /// selection set. Previous selections and any stale plan are cleared
    /// whether or not the scan succeeds.
    pub async fn scan(&mut self, address: &str) -> ConsolidatorResult<()> {
        self.selections.clear();
        self.scan = None;
        self.reset();

        let result = scan_balances(self.balances.as_ref(), &self.settings, address).await;
        let scan = self.track(result)?;

        for entry in scan.items.iter().filter(|e| !e.has_error) {
            // Qualifying chains carry at least one token; only the asset of
            // interest survives the scan filter
            let Some(token) = entry.items.first() else {
                continue;
            };
            let max_amount = token
                .balance
                .as_deref()
                .and_then(|b| U256::from_str(b).ok())
                .unwrap_or(U256::ZERO);
            let usd_value = token
                .quote
                .and_then(Decimal::from_f64)
                .unwrap_or(Decimal::ZERO);

            self.selections.insert(
                entry.chain_name.clone(),
                ChainSelection {
                    chain_name: entry.chain_name.clone(),
                    max_amount,
                    amount: String::new(),
                    selected: false,
                    usd_value,
                },
            );
        }

        info!(
            chains = self.selections.len(),
            errors = scan.items.iter().filter(|e| e.has_error).count(),
            "Balance scan complete"
        );

        self.address = Some(address.to_string());
        self.scan = Some(scan);
        Ok(())
    }

    /// Raw scan result, including per-chain error entries
    pub fn balance_scan(&self) -> Option<&BalanceScan> {
        self.scan.as_ref()
    }

    pub fn selections(&self) -> &BTreeMap<String, ChainSelection> {
        &self.selections
    }

    // -----------------------------------------------------------------------
    // Selection edits (keyed reducers)
    // -----------------------------------------------------------------------

    /// Toggle a chain's selection; deselecting clears its amount
    pub fn set_selected(&mut self, chain: &str, selected: bool) -> ConsolidatorResult<()> {
        let result = (|| {
            let entry = self
                .selections
                .get_mut(chain)
                .ok_or_else(|| ConsolidatorError::UnknownChain {
                    chain: chain.to_string(),
                })?;
            entry.selected = selected;
            if !selected {
                entry.amount.clear();
            }
            Ok(())
        })();
        self.track(result)
    }

    /// Set a chain's amount, enforcing `0 < amount <= max_amount`.
    ///
    /// Empty or zero input clears the selection; invalid input is rejected
    /// and the stored amount is left unchanged.
    pub fn set_amount(&mut self, chain: &str, amount: &str) -> ConsolidatorResult<()> {
        let decimals = self.settings.asset.decimals;
        let result = (|| {
            let entry = self
                .selections
                .get_mut(chain)
                .ok_or_else(|| ConsolidatorError::UnknownChain {
                    chain: chain.to_string(),
                })?;

            if amounts::parse_positive_decimal(amount).is_none() {
                if amount.trim().is_empty() || amounts::to_base_units(amount, decimals).is_ok() {
                    // "" or a parseable zero: unselect
                    entry.amount = amount.to_string();
                    entry.selected = false;
                    return Ok(());
                }
                return Err(ConsolidatorError::Selection {
                    chain: chain.to_string(),
                    message: format!("{amount:?} is not a positive amount"),
                });
            }

            let base = amounts::to_base_units(amount, decimals).map_err(|e| {
                ConsolidatorError::Selection {
                    chain: chain.to_string(),
                    message: e.to_string(),
                }
            })?;

            if base.is_zero() {
                // Positive as entered, but below one base unit after
                // truncation; storing it would select a zero-amount origin
                return Err(ConsolidatorError::Selection {
                    chain: chain.to_string(),
                    message: format!("{amount:?} truncates to zero base units"),
                });
            }

            if base > entry.max_amount {
                return Err(ConsolidatorError::Selection {
                    chain: chain.to_string(),
                    message: format!(
                        "amount {amount} exceeds available balance of {} base units",
                        entry.max_amount
                    ),
                });
            }

            entry.amount = amount.to_string();
            entry.selected = true;
            Ok(())
        })();
        self.track(result)
    }

    /// Select a chain's entire available balance
    pub fn select_max(&mut self, chain: &str) -> ConsolidatorResult<()> {
        let decimals = self.settings.asset.decimals;
        let max = self
            .selections
            .get(chain)
            .map(|e| e.max_amount)
            .ok_or_else(|| ConsolidatorError::UnknownChain {
                chain: chain.to_string(),
            });
        let max = self.track(max)?;

        let full = amounts::from_base_units(&max, decimals);
        let full = self.track(full)?;
        self.set_amount(chain, &full.normalize().to_string())
    }

    // -----------------------------------------------------------------------
    // Destination and totals
    // -----------------------------------------------------------------------

    pub fn set_destination_chain(&mut self, chain_id: u64) -> ConsolidatorResult<()> {
        let result = if self.settings.chain_by_id(chain_id).is_some() {
            self.destination_chain_id = chain_id;
            Ok(())
        } else {
            Err(ConsolidatorError::ChainNotFound { chain_id })
        };
        self.track(result)
    }

    pub fn destination_chain(&self) -> u64 {
        self.destination_chain_id
    }

    /// Sum of the human-entered amounts over the active selections
    pub fn total_selected_amount(&self) -> Decimal {
        self.active_selections()
            .filter_map(|s| amounts::parse_positive_decimal(&s.amount))
            .sum()
    }

    /// USD value of the active selections, prorating each chain's quote by
    /// the selected fraction of its balance.
    ///
    /// Assumes a uniform per-unit price across the balance (the provider's
    /// quote is a snapshot of the whole holding). A zero balance cannot be
    /// prorated and contributes nothing.
    pub fn total_selected_usd_value(&self) -> Decimal {
        let decimals = self.settings.asset.decimals;
        self.active_selections()
            .filter_map(|s| {
                if s.max_amount.is_zero() {
                    return None;
                }
                let amount_base = amounts::to_base_units(&s.amount, decimals).ok()?;
                let ratio = amounts::from_base_units(&amount_base, decimals)
                    .ok()?
                    .checked_div(amounts::from_base_units(&s.max_amount, decimals).ok()?)?;
                s.usd_value.checked_mul(ratio)
            })
            .sum()
    }

    fn active_selections(&self) -> impl Iterator<Item = &ChainSelection> {
        self.selections
            .values()
            .filter(|s| s.selected && amounts::parse_positive_decimal(&s.amount).is_some())
    }

    // -----------------------------------------------------------------------
    // Quote and plan
    // -----------------------------------------------------------------------

    /// Request a consolidation quote for the current selections and compile
    /// it into an execution plan.
    ///
    /// All-or-nothing: any stale plan is discarded up front, and a new one is
    /// installed only if the request, the response, and compilation all
    /// succeed.
    pub async fn fetch_quote(&mut self) -> ConsolidatorResult<()> {
        self.executor = None;

        let result = self.fetch_quote_inner().await;
        let plan = self.track(result)?;

        debug!(
            transactions = plan.transactions.len(),
            "Execution plan compiled"
        );
        self.executor = Some(Executor::new(plan, &self.settings.executor));
        Ok(())
    }

    async fn fetch_quote_inner(&self) -> ConsolidatorResult<ExecutionPlan> {
        let address = self.address.as_deref().ok_or(ConsolidatorError::NoAddress)?;
        let decimals = self.settings.asset.decimals;

        let origins = self
            .active_selections()
            .map(|s| {
                Ok(SelectedOrigin {
                    chain_name: s.chain_name.clone(),
                    amount_base: amounts::to_base_units(&s.amount, decimals)?,
                })
            })
            .collect::<ConsolidatorResult<Vec<_>>>()?;

        let request =
            build_quote_request(&self.settings, address, self.destination_chain_id, &origins)?;

        crate::metrics::record_quote_requested();
        let response = self.quotes.fetch_quote(&request).await?;

        compile_plan(response)
    }

    pub fn plan(&self) -> Option<&ExecutionPlan> {
        self.executor.as_ref().map(|e| e.plan())
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Execute the next transaction of the compiled plan
    pub async fn execute_next(&mut self) -> ConsolidatorResult<()> {
        let wallet = Arc::clone(&self.wallet);
        let result = match self.executor.as_mut() {
            Some(executor) => executor.execute_next(wallet.as_ref()).await,
            None => Err(ConsolidatorError::NoPlan),
        };
        self.track(result)
    }

    pub fn current_tx_index(&self) -> usize {
        self.executor.as_ref().map_or(0, |e| e.current_index())
    }

    pub fn completed_tx_ids(&self) -> &[String] {
        self.executor.as_ref().map_or(&[], |e| e.completed_ids())
    }

    pub fn is_execution_complete(&self) -> bool {
        self.executor.as_ref().is_some_and(|e| e.is_complete())
    }

    pub fn is_executing(&self) -> bool {
        self.executor.as_ref().is_some_and(|e| {
            matches!(
                e.phase(),
                ExecutionPhase::Executing | ExecutionPhase::AwaitingChainSwitch
            )
        })
    }

    // -----------------------------------------------------------------------
    // Resets and error surface
    // -----------------------------------------------------------------------

    /// Clear quote, plan, execution state, and the surfaced error, keeping
    /// the scanned balances and selections. Idempotent.
    pub fn reset(&mut self) {
        self.executor = None;
        self.error = None;
    }

    /// Return the execution cursor to the start of the current plan
    pub fn reset_execution(&mut self) {
        if let Some(executor) = self.executor.as_mut() {
            executor.reset();
        }
        self.error = None;
    }

    /// Wallet disconnected: drop everything, including scanned balances
    pub fn on_disconnect(&mut self) {
        self.address = None;
        self.scan = None;
        self.selections.clear();
        self.reset();
    }

    /// The single surfaced error from the most recent failed operation
    pub fn current_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record an operation's outcome on the surfaced error value
    fn track<T>(&mut self, result: ConsolidatorResult<T>) -> ConsolidatorResult<T> {
        match &result {
            Ok(_) => self.error = None,
            Err(e) => self.error = Some(e.to_string()),
        }
        result
    }
}
