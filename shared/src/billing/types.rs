//! Persisted billing records
//!
//! All monetary amounts are integer minor currency units (e.g. yen).
//! Timestamps are Unix milliseconds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Status and Tax Classification
// ============================================================================

/// Bill lifecycle status
///
/// Transitions only move forward: OPEN -> PARTIAL -> COMPLETED.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    /// No settlement activity yet
    #[default]
    Open,
    /// Settlement in progress (some fragments committed)
    Partial,
    /// Fully settled, no further mutation allowed
    Completed,
}

impl BillStatus {
    /// Whether the bill accepts further settlement activity
    pub fn is_settlable(&self) -> bool {
        !matches!(self, BillStatus::Completed)
    }
}

/// Consumption tax bucket a line falls into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxBucket {
    /// Standard rate (dine-in)
    #[default]
    Standard,
    /// Reduced rate (takeout)
    Reduced,
}

/// Tax rates for the two buckets, as fractions (0.10 = 10%)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxRates {
    pub standard: Decimal,
    pub reduced: Decimal,
}

impl TaxRates {
    /// Build rates from basis points (1000 bp = 10%)
    pub fn from_basis_points(standard_bp: u32, reduced_bp: u32) -> Self {
        Self {
            standard: Decimal::new(standard_bp as i64, 4),
            reduced: Decimal::new(reduced_bp as i64, 4),
        }
    }

    /// Rate for a bucket
    pub fn rate(&self, bucket: TaxBucket) -> Decimal {
        match bucket {
            TaxBucket::Standard => self.standard,
            TaxBucket::Reduced => self.reduced,
        }
    }

    /// Tax-inclusive multiplier for a bucket (1 + rate)
    pub fn multiplier(&self, bucket: TaxBucket) -> Decimal {
        Decimal::ONE + self.rate(bucket)
    }
}

impl Default for TaxRates {
    /// Japanese consumption tax: 10% standard, 8% reduced
    fn default() -> Self {
        Self::from_basis_points(1000, 800)
    }
}

// ============================================================================
// Bill
// ============================================================================

/// A bill: either a visit's root bill or a settlement fragment
///
/// Fragments carry `parent_id` pointing at the root they were split off
/// from. Split fragments additionally carry `split_index`; a root with a
/// split in progress carries `split_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    /// Bill ID
    pub id: String,
    /// Visit this bill belongs to
    pub visit_id: String,
    /// Parent bill (set on settlement fragments only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Lifecycle status
    pub status: BillStatus,
    /// Pre-tax sum of line subtotals
    pub subtotal: i64,
    /// Bill-level discount
    pub discount: i64,
    /// Tax-inclusive total
    pub total: i64,
    /// Amount tendered against this bill
    pub deposit: i64,
    /// Payment method used to settle (fragments)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    /// Cashier who took the payment (fragments)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashier_id: Option<String>,
    /// Position of this fragment in an even split (1-based)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_index: Option<u32>,
    /// Number of even-split shares (set on the root and its fragments)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_count: Option<u32>,
    /// Creation timestamp
    pub opened_at: i64,
    /// Settlement timestamp (set when the bill completes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<i64>,
}

impl Bill {
    /// Create a fresh root bill for a visit
    pub fn open(visit_id: impl Into<String>, opened_at: i64) -> Self {
        Self {
            id: crate::util::new_id(),
            visit_id: visit_id.into(),
            parent_id: None,
            status: BillStatus::Open,
            subtotal: 0,
            discount: 0,
            total: 0,
            deposit: 0,
            payment_method_id: None,
            cashier_id: None,
            split_index: None,
            split_count: None,
            opened_at,
            settled_at: None,
        }
    }

    /// Whether this bill is a settlement fragment
    pub fn is_fragment(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Whether an even split is in progress or recorded on this bill
    pub fn has_split(&self) -> bool {
        self.split_count.is_some_and(|c| c > 0)
    }
}

// ============================================================================
// Bill Line
// ============================================================================

/// A line on a bill
///
/// `subtotal` is the pre-tax amount for the entire `quantity`, not a unit
/// price. Lines are deleted outright when their quantity reaches zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillLine {
    /// Line ID
    pub id: String,
    /// Bill this line belongs to
    pub bill_id: String,
    /// Menu item reference
    pub item_ref: String,
    /// Item display name
    pub item_name: String,
    /// Quantity (always >= 1 while the line exists)
    pub quantity: u32,
    /// Pre-tax amount for the whole quantity
    pub subtotal: i64,
    /// Tax bucket
    pub tax_bucket: TaxBucket,
    /// Line-level discount (pre-tax)
    pub line_discount: i64,
}

// ============================================================================
// Receipt
// ============================================================================

/// A tax-compliant receipt issued against a bill
///
/// Net and tax amounts are recorded separately per bucket. Receipts are
/// never deleted; voiding flips `voided` one way and keeps the record for
/// audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    /// Receipt ID
    pub id: String,
    /// Bill this receipt was issued against
    pub bill_id: String,
    /// Human-readable receipt number, unique per business day
    pub receipt_no: String,
    /// Net amount, standard bucket
    pub net_standard: i64,
    /// Tax amount, standard bucket
    pub tax_standard: i64,
    /// Net amount, reduced bucket
    pub net_reduced: i64,
    /// Tax amount, reduced bucket
    pub tax_reduced: i64,
    /// Gross total covered by this receipt
    pub total: i64,
    /// User who issued the receipt
    pub issuer_id: String,
    /// Issuance timestamp
    pub issued_at: i64,
    /// Number of reprints after the original print
    pub reprint_count: u32,
    /// Whether the receipt has been voided
    pub voided: bool,
    /// Void timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voided_at: Option<i64>,
    /// User who voided the receipt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voided_by: Option<String>,
    /// Client-supplied idempotency key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl Receipt {
    /// Gross amount in the standard bucket
    pub fn gross_standard(&self) -> i64 {
        self.net_standard + self.tax_standard
    }

    /// Gross amount in the reduced bucket
    pub fn gross_reduced(&self) -> i64 {
        self.net_reduced + self.tax_reduced
    }
}

// ============================================================================
// Visit
// ============================================================================

/// A customer visit (one seating)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Visit ID
    pub id: String,
    /// Table reference, if seated at a table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_ref: Option<String>,
    /// Party size, if recorded at check-in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
    /// Check-in timestamp
    pub checked_in_at: i64,
    /// Check-out timestamp (set when the root bill completes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_out_at: Option<i64>,
    /// Whether the visit is still active
    pub active: bool,
}

impl Visit {
    /// Create an active visit
    pub fn check_in(table_ref: Option<String>, party_size: Option<u32>, checked_in_at: i64) -> Self {
        Self {
            id: crate::util::new_id(),
            table_ref,
            party_size,
            checked_in_at,
            checked_out_at: None,
            active: true,
        }
    }
}
