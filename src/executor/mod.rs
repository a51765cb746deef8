//! Sequential cross-chain transaction execution
//!
//! Walks a compiled [`ExecutionPlan`] one transaction at a time, switching
//! the wallet's active chain when the next transaction lives elsewhere. The
//! cursor only advances on a confirmed submission, so any failed step is
//! retried from scratch (chain switch included) on the next call.

use crate::config::ExecutorConfig;
use crate::error::{ConsolidatorError, ConsolidatorResult};
use crate::plan::{ExecutionPlan, TransactionRequest};

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// External wallet seam: chain switching and transaction submission.
///
/// The wallet holds the keys and performs the actual signing; this crate
/// only drives it.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Chain the wallet is currently operating on. May change outside this
    /// system's control.
    async fn current_chain_id(&self) -> ConsolidatorResult<u64>;

    /// Ask the wallet to switch its active chain
    async fn switch_chain(&self, chain_id: u64) -> ConsolidatorResult<()>;

    /// Submit a transaction, returning the wallet's identifier for it.
    /// An empty identifier is tolerated; the executor falls back to the
    /// step's request id.
    async fn submit(&self, tx: &TransactionRequest) -> ConsolidatorResult<String>;
}

/// Executor lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Idle,
    Executing,
    AwaitingChainSwitch,
    Completed,
    Failed,
}

/// Cursor-driven executor over an immutable plan
pub struct Executor {
    plan: ExecutionPlan,
    current_index: usize,
    completed_ids: Vec<String>,
    phase: ExecutionPhase,
    last_error: Option<String>,
    /// Grace period after a chain switch before the wallet's execution
    /// context is reliable
    settle_delay: Duration,
}

impl Executor {
    pub fn new(plan: ExecutionPlan, config: &ExecutorConfig) -> Self {
        Self {
            plan,
            current_index: 0,
            completed_ids: Vec::new(),
            phase: ExecutionPhase::Idle,
            last_error: None,
            settle_delay: Duration::from_millis(config.chain_switch_settle_ms),
        }
    }

    /// Execute the transaction at the cursor.
    ///
    /// Re-entrant calls while a submission is in flight are no-ops. On any
    /// failure the cursor stays put and the same step is retried on the next
    /// call; on success the cursor advances by exactly one.
    pub async fn execute_next(&mut self, wallet: &dyn WalletProvider) -> ConsolidatorResult<()> {
        match self.phase {
            ExecutionPhase::Executing | ExecutionPhase::AwaitingChainSwitch => {
                debug!("Execution already in flight; ignoring re-entrant call");
                return Ok(());
            }
            _ => {}
        }

        if self.is_complete() {
            return Err(ConsolidatorError::ExecutionComplete);
        }

        let index = self.current_index;
        let tx = self.plan.transactions[index].clone();
        self.phase = ExecutionPhase::Executing;
        self.last_error = None;

        // Switch the active chain if the next transaction lives elsewhere
        let active_chain = match wallet.current_chain_id().await {
            Ok(id) => id,
            Err(e) => {
                return Err(self.fail(ConsolidatorError::ChainSwitch {
                    chain_id: tx.chain_id,
                    message: e.to_string(),
                }));
            }
        };

        if active_chain != tx.chain_id {
            self.phase = ExecutionPhase::AwaitingChainSwitch;
            info!(
                from = active_chain,
                to = tx.chain_id,
                step = index,
                "Switching active chain"
            );
            crate::metrics::record_chain_switch(tx.chain_id);

            if let Err(e) = wallet.switch_chain(tx.chain_id).await {
                return Err(self.fail(ConsolidatorError::ChainSwitch {
                    chain_id: tx.chain_id,
                    message: e.to_string(),
                }));
            }

            // The wallet's execution context needs a moment after a switch
            // before submissions are reliable
            tokio::time::sleep(self.settle_delay).await;
            self.phase = ExecutionPhase::Executing;
        }

        match wallet.submit(&tx).await {
            Ok(identifier) => {
                let identifier = if !identifier.is_empty() {
                    identifier
                } else if !tx.request_id.is_empty() {
                    tx.request_id.clone()
                } else {
                    format!("tx-{index}")
                };

                info!(step = index, chain_id = tx.chain_id, id = %identifier,
                    "Transaction submitted");
                crate::metrics::record_tx_submitted(tx.chain_id);

                self.completed_ids.push(identifier);
                self.current_index += 1;
                self.phase = if self.is_complete() {
                    ExecutionPhase::Completed
                } else {
                    ExecutionPhase::Idle
                };
                Ok(())
            }
            Err(e) => {
                crate::metrics::record_tx_failed(tx.chain_id);
                Err(self.fail(ConsolidatorError::Submission {
                    index,
                    message: e.to_string(),
                }))
            }
        }
    }

    /// Return the cursor to the start, clearing completion and error state.
    /// Safe to call from any phase.
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.completed_ids.clear();
        self.last_error = None;
        self.phase = ExecutionPhase::Idle;
    }

    /// Derived from the cursor, so always consistent with it
    pub fn is_complete(&self) -> bool {
        self.current_index >= self.plan.transactions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn completed_ids(&self) -> &[String] {
        &self.completed_ids
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    fn fail(&mut self, error: ConsolidatorError) -> ConsolidatorError {
        warn!(step = self.current_index, error = %error, "Execution step failed");
        self.phase = ExecutionPhase::Failed;
        self.last_error = Some(error.to_string());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{FeeTotals, PlanSummary};
    use alloy_primitives::{Address, Bytes, U256};
    use std::sync::Mutex;

    /// Scripted wallet fake: tracks its active chain, records calls, and
    /// fails the next N switches/submissions on demand.
    struct ScriptedWallet {
        active_chain: Mutex<u64>,
        switch_calls: Mutex<Vec<u64>>,
        submitted: Mutex<Vec<String>>,
        fail_switches: Mutex<usize>,
        fail_submissions: Mutex<usize>,
        identifier: Option<String>,
    }

    impl ScriptedWallet {
        fn on_chain(chain_id: u64) -> Self {
            Self {
                active_chain: Mutex::new(chain_id),
                switch_calls: Mutex::new(Vec::new()),
                submitted: Mutex::new(Vec::new()),
                fail_switches: Mutex::new(0),
                fail_submissions: Mutex::new(0),
                identifier: Some("0xhash".to_string()),
            }
        }

        fn returning_identifier(mut self, identifier: Option<&str>) -> Self {
            self.identifier = identifier.map(str::to_string);
            self
        }

        fn fail_next_switches(self, n: usize) -> Self {
            *self.fail_switches.lock().unwrap() = n;
            self
        }

        fn fail_next_submissions(self, n: usize) -> Self {
            *self.fail_submissions.lock().unwrap() = n;
            self
        }
    }

    #[async_trait]
    impl WalletProvider for ScriptedWallet {
        async fn current_chain_id(&self) -> ConsolidatorResult<u64> {
            Ok(*self.active_chain.lock().unwrap())
        }

        async fn switch_chain(&self, chain_id: u64) -> ConsolidatorResult<()> {
            self.switch_calls.lock().unwrap().push(chain_id);
            let mut failures = self.fail_switches.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ConsolidatorError::ChainSwitch {
                    chain_id,
                    message: "user rejected switch".to_string(),
                });
            }
            *self.active_chain.lock().unwrap() = chain_id;
            Ok(())
        }

        async fn submit(&self, tx: &TransactionRequest) -> ConsolidatorResult<String> {
            let mut failures = self.fail_submissions.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ConsolidatorError::Submission {
                    index: 0,
                    message: "wallet rejected".to_string(),
                });
            }
            self.submitted.lock().unwrap().push(tx.request_id.clone());
            Ok(self.identifier.clone().unwrap_or_default())
        }
    }

    fn tx(chain_id: u64, request_id: &str) -> TransactionRequest {
        TransactionRequest {
            from: Address::ZERO,
            to: Address::ZERO,
            data: Bytes::new(),
            value: U256::ZERO,
            chain_id,
            gas: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            request_id: request_id.to_string(),
        }
    }

    fn plan(txs: Vec<TransactionRequest>) -> ExecutionPlan {
        ExecutionPlan {
            transactions: txs,
            total_fees: FeeTotals {
                gas: "0".into(),
                relayer: "0".into(),
                relayer_gas: "0".into(),
                relayer_service: "0".into(),
                app: "0".into(),
            },
            summary: PlanSummary {
                total_input: "0".into(),
                total_output: "0".into(),
                total_impact: "0".into(),
                time_estimate: 0,
            },
        }
    }

    fn executor(txs: Vec<TransactionRequest>) -> Executor {
        let config = ExecutorConfig {
            default_destination_chain_id: 8453,
            chain_switch_settle_ms: 0,
        };
        Executor::new(plan(txs), &config)
    }

    #[tokio::test]
    async fn test_completion_detection() {
        let wallet = ScriptedWallet::on_chain(1);
        let mut exec = executor(vec![tx(1, "a"), tx(1, "b")]);

        assert!(!exec.is_complete());
        exec.execute_next(&wallet).await.unwrap();
        assert_eq!(exec.current_index(), 1);
        assert!(!exec.is_complete());
        assert_eq!(exec.phase(), ExecutionPhase::Idle);

        exec.execute_next(&wallet).await.unwrap();
        assert_eq!(exec.current_index(), 2);
        assert!(exec.is_complete());
        assert_eq!(exec.phase(), ExecutionPhase::Completed);

        // Past the end
        let err = exec.execute_next(&wallet).await.unwrap_err();
        assert!(matches!(err, ConsolidatorError::ExecutionComplete));
    }

    #[tokio::test]
    async fn test_failed_submission_does_not_advance() {
        let wallet = ScriptedWallet::on_chain(1).fail_next_submissions(1);
        let mut exec = executor(vec![tx(1, "a"), tx(1, "b")]);

        let err = exec.execute_next(&wallet).await.unwrap_err();
        assert!(matches!(err, ConsolidatorError::Submission { index: 0, .. }));
        assert_eq!(exec.current_index(), 0);
        assert_eq!(exec.phase(), ExecutionPhase::Failed);
        assert!(exec.last_error().unwrap().contains("wallet rejected"));

        // Retry executes index 0, not index 1
        exec.execute_next(&wallet).await.unwrap();
        assert_eq!(exec.current_index(), 1);
        assert_eq!(wallet.submitted.lock().unwrap().as_slice(), ["a"]);
    }

    #[tokio::test]
    async fn test_switch_failure_retries_from_scratch() {
        let wallet = ScriptedWallet::on_chain(1).fail_next_switches(1);
        let mut exec = executor(vec![tx(10, "a")]);

        let err = exec.execute_next(&wallet).await.unwrap_err();
        assert!(matches!(err, ConsolidatorError::ChainSwitch { chain_id: 10, .. }));
        assert_eq!(exec.current_index(), 0);
        assert!(wallet.submitted.lock().unwrap().is_empty());

        // Retry repeats the chain switch, then submits
        exec.execute_next(&wallet).await.unwrap();
        assert_eq!(wallet.switch_calls.lock().unwrap().as_slice(), [10, 10]);
        assert_eq!(exec.current_index(), 1);
        assert_eq!(exec.phase(), ExecutionPhase::Completed);
    }

    #[tokio::test]
    async fn test_switches_only_when_chain_differs() {
        let wallet = ScriptedWallet::on_chain(10);
        let mut exec = executor(vec![tx(10, "a"), tx(8453, "b"), tx(8453, "c")]);

        exec.execute_next(&wallet).await.unwrap();
        exec.execute_next(&wallet).await.unwrap();
        exec.execute_next(&wallet).await.unwrap();

        // One switch for the 10 -> 8453 boundary; none for same-chain steps
        assert_eq!(wallet.switch_calls.lock().unwrap().as_slice(), [8453]);
        assert!(exec.is_complete());
    }

    #[tokio::test]
    async fn test_identifier_fallback_chain() {
        // Wallet identifier wins when present
        let wallet = ScriptedWallet::on_chain(1);
        let mut exec = executor(vec![tx(1, "req-1")]);
        exec.execute_next(&wallet).await.unwrap();
        assert_eq!(exec.completed_ids(), ["0xhash"]);

        // Empty wallet identifier falls back to the request id
        let wallet = ScriptedWallet::on_chain(1).returning_identifier(None);
        let mut exec = executor(vec![tx(1, "req-1")]);
        exec.execute_next(&wallet).await.unwrap();
        assert_eq!(exec.completed_ids(), ["req-1"]);

        // No request id either: synthetic index-based identifier
        let wallet = ScriptedWallet::on_chain(1).returning_identifier(None);
        let mut exec = executor(vec![tx(1, "")]);
        exec.execute_next(&wallet).await.unwrap();
        assert_eq!(exec.completed_ids(), ["tx-0"]);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let wallet = ScriptedWallet::on_chain(1);
        let mut exec = executor(vec![tx(1, "a"), tx(1, "b")]);
        exec.execute_next(&wallet).await.unwrap();

        exec.reset();
        let after_one = (
            exec.current_index(),
            exec.completed_ids().to_vec(),
            exec.phase(),
            exec.last_error().map(str::to_string),
        );

        exec.reset();
        let after_two = (
            exec.current_index(),
            exec.completed_ids().to_vec(),
            exec.phase(),
            exec.last_error().map(str::to_string),
        );

        assert_eq!(after_one, after_two);
        assert_eq!(after_one.0, 0);
        assert!(after_one.1.is_empty());
        assert_eq!(after_one.2, ExecutionPhase::Idle);
    }

    #[tokio::test]
    async fn test_reset_clears_failed_state() {
        let wallet = ScriptedWallet::on_chain(1).fail_next_submissions(1);
        let mut exec = executor(vec![tx(1, "a")]);
        exec.execute_next(&wallet).await.unwrap_err();
        assert_eq!(exec.phase(), ExecutionPhase::Failed);

        exec.reset();
        assert_eq!(exec.phase(), ExecutionPhase::Idle);
        assert!(exec.last_error().is_none());

        exec.execute_next(&wallet).await.unwrap();
        assert!(exec.is_complete());
    }

    #[tokio::test]
    async fn test_in_flight_latch_is_a_noop() {
        let wallet = ScriptedWallet::on_chain(1);
        let mut exec = executor(vec![tx(1, "a")]);
        exec.phase = ExecutionPhase::Executing;

        exec.execute_next(&wallet).await.unwrap();
        assert_eq!(exec.current_index(), 0);
        assert!(wallet.submitted.lock().unwrap().is_empty());
        assert!(wallet.switch_calls.lock().unwrap().is_empty());
    }
}
