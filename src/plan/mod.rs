//! Execution plan compilation
//!
//! Parses the quote provider's multi-step response into an ordered,
//! chain-tagged transaction plan. The wire types below are deliberately
//! permissive (everything optional); compilation is the strict boundary that
//! either produces a complete [`ExecutionPlan`] or fails without producing
//! anything.

use crate::error::{ConsolidatorError, ConsolidatorResult};

use alloy_primitives::{Address, Bytes, U256};
use serde::Deserialize;
use std::str::FromStr;
use tracing::warn;

/// Fallback when a step omits its chain id. Triggering this is a
/// quoting-provider contract violation, never expected in practice.
const DEFAULT_CHAIN_ID: u64 = 1;

// ---------------------------------------------------------------------------
// Wire types (loosely shaped, as received from the quote provider)
// ---------------------------------------------------------------------------

/// Raw multi-step quote response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteResponse {
    #[serde(default)]
    pub steps: Vec<QuoteStep>,
    pub fees: Option<QuoteFees>,
    pub details: Option<QuoteDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteStep {
    pub id: Option<String>,
    pub request_id: Option<String>,
    #[serde(default)]
    pub items: Vec<StepItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepItem {
    pub status: Option<String>,
    pub data: Option<StepTransaction>,
}

/// Transaction payload carried by a step item; numeric fields arrive as
/// strings in either decimal or 0x-hex form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTransaction {
    pub from: Option<String>,
    pub to: Option<String>,
    pub data: Option<String>,
    pub value: Option<String>,
    pub chain_id: Option<u64>,
    pub gas: Option<String>,
    pub gas_price: Option<String>,
    pub max_fee_per_gas: Option<String>,
    pub max_priority_fee_per_gas: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFees {
    pub gas: Option<FeeAmount>,
    pub relayer: Option<FeeAmount>,
    pub relayer_gas: Option<FeeAmount>,
    pub relayer_service: Option<FeeAmount>,
    pub app: Option<FeeAmount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAmount {
    pub amount_formatted: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetails {
    pub currency_in: Option<CurrencyAmount>,
    pub currency_out: Option<CurrencyAmount>,
    pub total_impact: Option<ImpactAmount>,
    pub time_estimate: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyAmount {
    pub amount_formatted: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImpactAmount {
    pub usd: Option<String>,
}

// ---------------------------------------------------------------------------
// Strict internal representation
// ---------------------------------------------------------------------------

/// One on-chain call, fully parsed and immutable once built.
///
/// Optional gas fields are `None` when the source step did not provide them;
/// a present-but-zero gas field means something different from "let the
/// network estimate", so absence is never defaulted to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub chain_id: u64,
    pub gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    /// Step request id, used for completion tracking; empty if absent
    pub request_id: String,
}

/// Fee breakdown as display strings, `"0"` when absent upstream
#[derive(Debug, Clone, PartialEq)]
pub struct FeeTotals {
    pub gas: String,
    pub relayer: String,
    pub relayer_gas: String,
    pub relayer_service: String,
    pub app: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanSummary {
    pub total_input: String,
    pub total_output: String,
    pub total_impact: String,
    /// Estimated completion time in seconds
    pub time_estimate: u64,
}

/// Ordered, chain-tagged execution plan derived from a quote.
///
/// Transaction order is exactly the step order of the source quote; the
/// compiler never reorders by chain or fee.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub transactions: Vec<TransactionRequest>,
    pub total_fees: FeeTotals,
    pub summary: PlanSummary,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile a quote response into an execution plan.
///
/// All-or-nothing: an empty `steps` array or any malformed step fails the
/// whole compilation and no plan is produced. Fee and summary extraction is
/// permissive and never fails.
pub fn compile_plan(response: QuoteResponse) -> ConsolidatorResult<ExecutionPlan> {
    if response.steps.is_empty() {
        return Err(ConsolidatorError::EmptyQuote);
    }

    let transactions = response
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| compile_step(index, step))
        .collect::<ConsolidatorResult<Vec<_>>>()?;

    let total_fees = extract_fees(response.fees.as_ref());
    let summary = extract_summary(response.details.as_ref());

    crate::metrics::record_plan_compiled();

    Ok(ExecutionPlan {
        transactions,
        total_fees,
        summary,
    })
}

/// Compile one step into a transaction request.
///
/// A step is assumed to carry exactly one actionable item; its first item's
/// transaction payload becomes the request.
fn compile_step(index: usize, step: &QuoteStep) -> ConsolidatorResult<TransactionRequest> {
    let item = step
        .items
        .first()
        .ok_or_else(|| malformed(index, "no actionable item"))?;

    let tx = item
        .data
        .as_ref()
        .ok_or_else(|| malformed(index, "item has no transaction payload"))?;

    let from = parse_address(index, "from", tx.from.as_deref())?;
    let to = parse_address(index, "to", tx.to.as_deref())?;

    let data = Bytes::from_str(tx.data.as_deref().unwrap_or("0x"))
        .map_err(|e| malformed(index, &format!("invalid calldata: {e}")))?;

    let value = parse_u256(index, "value", tx.value.as_deref().unwrap_or("0"))?;

    let chain_id = match tx.chain_id {
        Some(id) => id,
        None => {
            // Quoting-provider contract violation: every step must be
            // chain-tagged. Flag it loudly instead of routing silently.
            warn!(
                step = index,
                fallback = DEFAULT_CHAIN_ID,
                "Quote step is missing its chain id; falling back to mainnet"
            );
            DEFAULT_CHAIN_ID
        }
    };

    Ok(TransactionRequest {
        from,
        to,
        data,
        value,
        chain_id,
        gas: parse_optional_u256(index, "gas", tx.gas.as_deref())?,
        gas_price: parse_optional_u256(index, "gasPrice", tx.gas_price.as_deref())?,
        max_fee_per_gas: parse_optional_u256(index, "maxFeePerGas", tx.max_fee_per_gas.as_deref())?,
        max_priority_fee_per_gas: parse_optional_u256(
            index,
            "maxPriorityFeePerGas",
            tx.max_priority_fee_per_gas.as_deref(),
        )?,
        request_id: step.request_id.clone().unwrap_or_default(),
    })
}

fn extract_fees(fees: Option<&QuoteFees>) -> FeeTotals {
    let formatted = |fee: Option<&FeeAmount>| -> String {
        fee.and_then(|f| f.amount_formatted.clone())
            .unwrap_or_else(|| "0".to_string())
    };

    FeeTotals {
        gas: formatted(fees.and_then(|f| f.gas.as_ref())),
        relayer: formatted(fees.and_then(|f| f.relayer.as_ref())),
        relayer_gas: formatted(fees.and_then(|f| f.relayer_gas.as_ref())),
        relayer_service: formatted(fees.and_then(|f| f.relayer_service.as_ref())),
        app: formatted(fees.and_then(|f| f.app.as_ref())),
    }
}

fn extract_summary(details: Option<&QuoteDetails>) -> PlanSummary {
    let formatted = |currency: Option<&CurrencyAmount>| -> String {
        currency
            .and_then(|c| c.amount_formatted.clone())
            .unwrap_or_else(|| "0".to_string())
    };

    PlanSummary {
        total_input: formatted(details.and_then(|d| d.currency_in.as_ref())),
        total_output: formatted(details.and_then(|d| d.currency_out.as_ref())),
        total_impact: details
            .and_then(|d| d.total_impact.as_ref())
            .and_then(|i| i.usd.clone())
            .unwrap_or_else(|| "0".to_string()),
        time_estimate: details.and_then(|d| d.time_estimate).unwrap_or(0),
    }
}

fn parse_address(index: usize, field: &str, value: Option<&str>) -> ConsolidatorResult<Address> {
    let raw = value.ok_or_else(|| malformed(index, &format!("missing {field} address")))?;
    Address::from_str(raw).map_err(|e| malformed(index, &format!("invalid {field} address: {e}")))
}

fn parse_u256(index: usize, field: &str, raw: &str) -> ConsolidatorResult<U256> {
    U256::from_str(raw).map_err(|e| malformed(index, &format!("invalid {field}: {e}")))
}

fn parse_optional_u256(
    index: usize,
    field: &str,
    raw: Option<&str>,
) -> ConsolidatorResult<Option<U256>> {
    raw.map(|r| parse_u256(index, field, r)).transpose()
}

fn malformed(index: usize, message: &str) -> ConsolidatorError {
    ConsolidatorError::MalformedStep {
        index,
        message: message.to_string(),
    }
}
