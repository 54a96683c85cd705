//! Money calculation utilities using rust_decimal for precision
//!
//! All stored amounts are integer minor currency units (yen). Tax math
//! runs through `Decimal` and is rounded half-up back to minor units, so
//! no float ever touches a stored amount.

use crate::error::{SettlementError, SettlementResult};
use rust_decimal::prelude::*;
use shared::billing::{BillLine, TaxRates};

/// Tolerance for cumulative rounding drift across split shares (1 minor unit)
pub const MONEY_EPSILON: i64 = 1;

/// Maximum allowed amount for a single bill or payment (100 million minor units)
const MAX_AMOUNT: i64 = 100_000_000;

/// Convert minor units to Decimal
#[inline]
pub fn to_decimal(minor: i64) -> Decimal {
    Decimal::from(minor)
}

/// Round a decimal amount half-up to whole minor units
#[inline]
pub fn round_to_minor(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or_default()
}

/// Validate that an amount is non-negative and within bounds
pub fn validate_amount(value: i64, field_name: &str) -> SettlementResult<()> {
    if value < 0 {
        return Err(SettlementError::Validation(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    if value > MAX_AMOUNT {
        return Err(SettlementError::Validation(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_AMOUNT, value
        )));
    }
    Ok(())
}

/// Validate that a split index addresses a share of the split
pub fn validate_split_bounds(split_index: u32, split_count: u32) -> SettlementResult<()> {
    if split_index < 1 || split_index > split_count {
        return Err(SettlementError::Validation(format!(
            "split_index must be between 1 and {}, got {}",
            split_count, split_index
        )));
    }
    Ok(())
}

/// Tax-inclusive value of one line
///
/// Formula: max(subtotal - line_discount, 0) * (1 + rate), rounded half-up
pub fn taxed_line_total(line: &BillLine, rates: &TaxRates) -> i64 {
    let base = (line.subtotal - line.line_discount).max(0);
    round_to_minor(to_decimal(base) * rates.multiplier(line.tax_bucket))
}

/// Tax-inclusive total of a bill after the bill-level discount
///
/// Formula: max(sum(taxed line totals) - discount, 0)
pub fn discounted_bill_total(lines: &[BillLine], discount: i64, rates: &TaxRates) -> i64 {
    let taxed: i64 = lines.iter().map(|line| taxed_line_total(line, rates)).sum();
    (taxed - discount).max(0)
}

/// Amount one share of an even split is worth
///
/// Shares are the floor of total / split_count; the last share absorbs
/// the remainder so the shares always sum to the total exactly.
pub fn split_share(total: i64, split_count: u32, split_index: u32) -> i64 {
    let n = split_count as i64;
    let share = total / n;
    if split_index == split_count {
        total - share * (n - 1)
    } else {
        share
    }
}

/// Pre-tax amount a partial quantity of a line is worth
///
/// Formula: floor(subtotal * take / quantity). Multiplying first keeps
/// the division exact when the line is finally exhausted, so repeated
/// takes leave no residue behind.
pub fn line_portion(subtotal: i64, quantity: u32, take: u32) -> i64 {
    if quantity == 0 {
        return 0;
    }
    subtotal * take as i64 / quantity as i64
}
