//! Amount conversion between human-readable decimal strings and base units
//!
//! All money math runs on `rust_decimal` / `U256`; floats never touch an
//! amount. Conversion to base units truncates rather than rounds, so a user
//! can never be quoted for more than they typed.

use crate::error::{ConsolidatorError, ConsolidatorResult};

use alloy_primitives::U256;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Convert a human-entered decimal amount into a base-unit integer.
///
/// `floor(amount * 10^decimals)` — excess precision is truncated.
pub fn to_base_units(amount: &str, decimals: u32) -> ConsolidatorResult<U256> {
    let parsed = Decimal::from_str(amount.trim())
        .map_err(|e| ConsolidatorError::InvalidAmount(format!("{amount:?}: {e}")))?;

    if parsed.is_sign_negative() {
        return Err(ConsolidatorError::InvalidAmount(format!(
            "{amount:?}: negative amounts are not allowed"
        )));
    }

    let scaled = parsed
        .checked_mul(pow10(decimals)?)
        .ok_or_else(|| ConsolidatorError::InvalidAmount(format!("{amount:?}: overflow")))?
        .trunc();

    let base = scaled
        .to_u128()
        .ok_or_else(|| ConsolidatorError::InvalidAmount(format!("{amount:?}: overflow")))?;

    Ok(U256::from(base))
}

/// Convert a base-unit integer back into a decimal amount
pub fn from_base_units(amount: &U256, decimals: u32) -> ConsolidatorResult<Decimal> {
    let raw = u128::try_from(*amount).map_err(|_| {
        ConsolidatorError::InvalidAmount(format!("{amount}: exceeds representable range"))
    })?;
    let value = Decimal::from_u128(raw)
        .ok_or_else(|| {
            ConsolidatorError::InvalidAmount(format!("{amount}: exceeds representable range"))
        })?
        .checked_div(pow10(decimals)?)
        .ok_or_else(|| ConsolidatorError::InvalidAmount(format!("{amount}: overflow")))?;
    Ok(value)
}

/// Format a base-unit integer as a 2-decimal display string
pub fn format_display(amount: &U256, decimals: u32) -> ConsolidatorResult<String> {
    let value = from_base_units(amount, decimals)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Ok(format!("{value:.2}"))
}

/// Parse a user-entered amount, returning it only if strictly positive.
///
/// Empty strings, `"0"`, and unparsable input all mean "unselected".
pub fn parse_positive_decimal(amount: &str) -> Option<Decimal> {
    Decimal::from_str(amount.trim())
        .ok()
        .filter(|d| d.is_sign_positive() && !d.is_zero())
}

fn pow10(decimals: u32) -> ConsolidatorResult<Decimal> {
    if decimals > 28 {
        return Err(ConsolidatorError::Config(format!(
            "Unsupported decimal exponent: {decimals}"
        )));
    }
    Ok(Decimal::from_i128_with_scale(10i128.pow(decimals), 0))
}
