//! Read-model views assembled for terminals

use super::types::{BillStatus, TaxBucket};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Balances
// ============================================================================

/// Remaining issuable balance per tax bucket
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemainingBalance {
    /// Gross remaining in the standard bucket
    pub standard: i64,
    /// Gross remaining in the reduced bucket
    pub reduced: i64,
}

impl RemainingBalance {
    /// Total remaining across both buckets
    pub fn sum(&self) -> i64 {
        self.standard + self.reduced
    }
}

/// Net, tax, and gross amounts for one tax bucket
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketBreakdown {
    pub net: i64,
    pub tax: i64,
    pub gross: i64,
}

// ============================================================================
// Bill Summary
// ============================================================================

/// Per-bucket tax summary for a bill, with issuance state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillSummary {
    /// Bill ID
    pub bill_id: String,
    /// Lifecycle status
    pub status: BillStatus,
    /// Pre-tax sum of line subtotals
    pub subtotal: i64,
    /// Bill-level discount
    pub discount: i64,
    /// Tax-inclusive total after discount
    pub total: i64,
    /// Standard-bucket breakdown
    pub standard: BucketBreakdown,
    /// Reduced-bucket breakdown
    pub reduced: BucketBreakdown,
    /// Balance still available for receipt issuance
    pub remaining: RemainingBalance,
}

// ============================================================================
// Remaining Settlement
// ============================================================================

/// What is left to settle on a root bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemainingSettlement {
    /// Root bill ID
    pub bill_id: String,
    /// Tax-inclusive total of the bill
    pub total: i64,
    /// Amount already claimed by committed fragments
    pub settled: i64,
    /// Amount still outstanding
    pub remaining: i64,
    /// Lines not yet paid for (itemized mode; full line list otherwise)
    pub unpaid_lines: Vec<UnpaidLine>,
    /// Committed settlement fragments
    pub children: Vec<ChildSettlement>,
    /// Whether the bill has fully settled
    pub fully_settled: bool,
}

/// A line still awaiting payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpaidLine {
    /// Line ID
    pub line_id: String,
    /// Item display name
    pub item_name: String,
    /// Remaining quantity
    pub quantity: u32,
    /// Pre-tax amount for the remaining quantity
    pub subtotal: i64,
    /// Line-level discount
    pub line_discount: i64,
    /// Tax bucket
    pub tax_bucket: TaxBucket,
    /// Tax rate applied to this line (0.10 = 10%)
    pub tax_rate: Decimal,
    /// Tax-inclusive value of the remaining quantity
    pub total_with_tax: i64,
}

/// A committed settlement fragment, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildSettlement {
    /// Fragment bill ID
    pub bill_id: String,
    /// Share position if part of an even split
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_index: Option<u32>,
    /// Amount this fragment settled
    pub total: i64,
    /// Payment method used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    /// Cashier display name, when resolvable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashier_name: Option<String>,
    /// Settlement timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<i64>,
}

// ============================================================================
// Receipt Views
// ============================================================================

/// A receipt as shown in listings, with display names resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptView {
    /// Receipt ID
    pub receipt_id: String,
    /// Bill the receipt was issued against
    pub bill_id: String,
    /// Human-readable receipt number
    pub receipt_no: String,
    /// Net amount, standard bucket
    pub net_standard: i64,
    /// Tax amount, standard bucket
    pub tax_standard: i64,
    /// Net amount, reduced bucket
    pub net_reduced: i64,
    /// Tax amount, reduced bucket
    pub tax_reduced: i64,
    /// Gross total covered
    pub total: i64,
    /// Issuer display name, when resolvable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_name: Option<String>,
    /// Issuance timestamp
    pub issued_at: i64,
    /// Number of reprints
    pub reprint_count: u32,
    /// Whether the receipt has been voided
    pub voided: bool,
    /// Void timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voided_at: Option<i64>,
    /// Display name of the voiding user, when resolvable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voided_by_name: Option<String>,
}
