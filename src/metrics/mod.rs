//! Prometheus metrics for monitoring
//!
//! Exposes counters for:
//! - Balance scans and per-chain scan errors
//! - Quote requests and compiled plans
//! - Chain switches and transaction submissions
//!
//! Metrics register into the default registry; exposition (HTTP or
//! otherwise) is the embedder's responsibility.

use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec, Encoder, TextEncoder};

lazy_static! {
    // Balance discovery metrics
    pub static ref BALANCE_SCANS: Counter = register_counter!(
        "vacuum_balance_scans_total",
        "Total multi-chain balance scans completed"
    ).unwrap();

    pub static ref BALANCE_CHAIN_ERRORS: CounterVec = register_counter_vec!(
        "vacuum_balance_chain_errors_total",
        "Per-chain balance fetch failures captured during a scan",
        &["chain"]
    ).unwrap();

    // Quote metrics
    pub static ref QUOTES_REQUESTED: Counter = register_counter!(
        "vacuum_quotes_requested_total",
        "Total consolidation quotes requested"
    ).unwrap();

    pub static ref PLANS_COMPILED: Counter = register_counter!(
        "vacuum_plans_compiled_total",
        "Total execution plans successfully compiled"
    ).unwrap();

    // Execution metrics
    pub static ref CHAIN_SWITCHES: CounterVec = register_counter_vec!(
        "vacuum_chain_switches_total",
        "Total wallet chain switches requested",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "vacuum_transactions_submitted_total",
        "Total transactions submitted",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "vacuum_transactions_failed_total",
        "Total transaction submissions that failed",
        &["chain_id"]
    ).unwrap();
}

pub fn record_balance_scan() {
    BALANCE_SCANS.inc();
}

pub fn record_chain_scan_error(chain: &str) {
    BALANCE_CHAIN_ERRORS.with_label_values(&[chain]).inc();
}

pub fn record_quote_requested() {
    QUOTES_REQUESTED.inc();
}

pub fn record_plan_compiled() {
    PLANS_COMPILED.inc();
}

pub fn record_chain_switch(chain_id: u64) {
    CHAIN_SWITCHES
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_submitted(chain_id: u64) {
    TX_SUBMITTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_failed(chain_id: u64) {
    TX_FAILED.with_label_values(&[&chain_id.to_string()]).inc();
}

/// Render the default registry in the Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_ok() {
        String::from_utf8(buffer).unwrap_or_default()
    } else {
        String::new()
    }
}
