//! Tax apportionment across rate buckets
//!
//! A receipt may cover any amount up to the bill's remaining balance.
//! That amount is allocated across the two tax buckets proportionally to
//! what remains in each, then decomposed into net and tax per bucket.
//! Rounding residue always lands in the reduced bucket so the pieces sum
//! back to the requested amount exactly.

use crate::bills::money::{round_to_minor, taxed_line_total, to_decimal};
use shared::billing::{BillLine, RemainingBalance, TaxBucket, TaxRates};

/// Net/tax decomposition of an amount across the two buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaxSplit {
    pub net_standard: i64,
    pub tax_standard: i64,
    pub net_reduced: i64,
    pub tax_reduced: i64,
}

impl TaxSplit {
    /// Gross amount in the standard bucket
    pub fn gross_standard(&self) -> i64 {
        self.net_standard + self.tax_standard
    }

    /// Gross amount in the reduced bucket
    pub fn gross_reduced(&self) -> i64 {
        self.net_reduced + self.tax_reduced
    }

    /// Total gross amount across both buckets
    pub fn total(&self) -> i64 {
        self.gross_standard() + self.gross_reduced()
    }
}

/// Split gross into (net, tax) for one bucket
///
/// Formula: net = round_half_up(gross / (1 + rate)), tax = gross - net
fn decompose(gross: i64, bucket: TaxBucket, rates: &TaxRates) -> (i64, i64) {
    let net = round_to_minor(to_decimal(gross) / rates.multiplier(bucket));
    (net, gross - net)
}

/// Allocate `amount` across the buckets proportionally to `remaining`
///
/// The standard bucket gets round_half_up(amount * standard / sum); the
/// reduced bucket absorbs the residual, so the bucket grosses sum to
/// `amount` exactly. Each bucket gross then decomposes into net and tax.
/// If rounding ever leaves the reconstructed total off by one minor
/// unit, the difference is folded into the tax of a nonzero bucket,
/// standard first.
pub fn apportion(amount: i64, remaining: &RemainingBalance, rates: &TaxRates) -> TaxSplit {
    let pool = remaining.sum();
    if pool <= 0 || amount <= 0 {
        return TaxSplit::default();
    }

    let ratio = to_decimal(remaining.standard) / to_decimal(pool);
    let gross_standard = round_to_minor(to_decimal(amount) * ratio);
    let gross_reduced = amount - gross_standard;

    let (net_standard, tax_standard) = decompose(gross_standard, TaxBucket::Standard, rates);
    let (net_reduced, tax_reduced) = decompose(gross_reduced, TaxBucket::Reduced, rates);

    let mut split = TaxSplit {
        net_standard,
        tax_standard,
        net_reduced,
        tax_reduced,
    };

    // Reconcile sub-unit drift into a bucket that actually has an amount
    let drift = amount - split.total();
    if drift != 0 && drift.abs() <= 1 {
        if gross_standard != 0 {
            split.tax_standard += drift;
        } else if gross_reduced != 0 {
            split.tax_reduced += drift;
        }
    }

    split
}

/// Apportion a bill-level discount across the bucket grosses
///
/// Proportional to gross, rounded half-up on the standard side, residual
/// to reduced. A discount at or above the combined gross consumes both
/// buckets entirely.
pub fn apportion_discount(discount: i64, gross_standard: i64, gross_reduced: i64) -> (i64, i64) {
    let sum = gross_standard + gross_reduced;
    if discount <= 0 || sum <= 0 {
        return (0, 0);
    }
    if discount >= sum {
        return (gross_standard, gross_reduced);
    }

    let ratio = to_decimal(gross_standard) / to_decimal(sum);
    let off_standard = round_to_minor(to_decimal(discount) * ratio).min(gross_standard);
    (off_standard, discount - off_standard)
}

/// Per-bucket net/tax totals of a bill's current lines
///
/// Line discounts are already inside each line's taxed total; the
/// bill-level discount is apportioned across the bucket grosses before
/// the net/tax decomposition.
pub fn bucket_totals(lines: &[BillLine], discount: i64, rates: &TaxRates) -> TaxSplit {
    let mut gross_standard: i64 = 0;
    let mut gross_reduced: i64 = 0;
    for line in lines {
        let taxed = taxed_line_total(line, rates);
        match line.tax_bucket {
            TaxBucket::Standard => gross_standard += taxed,
            TaxBucket::Reduced => gross_reduced += taxed,
        }
    }

    let (off_standard, off_reduced) = apportion_discount(discount, gross_standard, gross_reduced);
    let gross_standard = gross_standard - off_standard;
    let gross_reduced = gross_reduced - off_reduced;

    let (net_standard, tax_standard) = decompose(gross_standard, TaxBucket::Standard, rates);
    let (net_reduced, tax_reduced) = decompose(gross_reduced, TaxBucket::Reduced, rates);

    TaxSplit {
        net_standard,
        tax_standard,
        net_reduced,
        tax_reduced,
    }
}
