//! Platform fee split applied when a quote is accepted and becomes a booking.
//!
//! All arithmetic is done in integer minor units with the fee rate expressed
//! in basis points, so `platform_fee + provider_earnings == quote_amount`
//! holds exactly for every input.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::Cents;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// One hundred percent expressed in basis points.
pub const BPS_DENOMINATOR: i64 = 10_000;

/// Default platform commission: 18%.
pub const DEFAULT_FEE_BPS: i64 = 1_800;

/// Upper bound on a single quote (£1,000,000.00).
pub const MAX_QUOTE_AMOUNT_CENTS: Cents = 100_000_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Result of splitting a quote amount between the platform and the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeSplit {
    pub quote_amount: Cents,
    pub platform_fee: Cents,
    pub provider_earnings: Cents,
    /// What the customer pays. Fees are taken from the provider side, so this
    /// equals the quote amount.
    pub customer_total: Cents,
    pub fee_bps: i64,
}

// ---------------------------------------------------------------------------
// Logic
// ---------------------------------------------------------------------------

/// Validate a fee rate in basis points.
pub fn validate_fee_bps(fee_bps: i64) -> Result<(), CoreError> {
    if !(0..=BPS_DENOMINATOR).contains(&fee_bps) {
        return Err(CoreError::Validation(format!(
            "Fee rate must be between 0 and {BPS_DENOMINATOR} basis points, got {fee_bps}"
        )));
    }
    Ok(())
}

/// Validate a quoted amount in minor units.
pub fn validate_quote_amount(amount: Cents) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(
            "Quote amount must be greater than zero".into(),
        ));
    }
    if amount > MAX_QUOTE_AMOUNT_CENTS {
        return Err(CoreError::Validation(format!(
            "Quote amount must not exceed {MAX_QUOTE_AMOUNT_CENTS} minor units"
        )));
    }
    Ok(())
}

/// Split `amount` into platform fee and provider earnings.
///
/// The fee is rounded half-up to the nearest minor unit; earnings absorb the
/// remainder.
pub fn compute_fee_split(amount: Cents, fee_bps: i64) -> Result<FeeSplit, CoreError> {
    validate_quote_amount(amount)?;
    validate_fee_bps(fee_bps)?;

    let platform_fee = (amount * fee_bps + BPS_DENOMINATOR / 2) / BPS_DENOMINATOR;
    let provider_earnings = amount - platform_fee;

    Ok(FeeSplit {
        quote_amount: amount,
        platform_fee,
        provider_earnings,
        customer_total: amount,
        fee_bps,
    })
}

/// Convert a fractional rate such as `0.18` into basis points.
pub fn fee_rate_to_bps(rate: f64) -> Result<i64, CoreError> {
    if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
        return Err(CoreError::Validation(format!(
            "Fee rate must be between 0 and 1, got {rate}"
        )));
    }
    Ok((rate * BPS_DENOMINATOR as f64).round() as i64)
}

/// Format minor units as a pounds string, e.g. `12345` -> `"£123.45"`.
pub fn format_gbp(amount: Cents) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.abs();
    format!("{sign}£{}.{:02}", abs / 100, abs % 100)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
