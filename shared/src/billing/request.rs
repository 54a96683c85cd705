//! Settlement and receipt requests sent by terminals

use super::types::TaxBucket;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

// ============================================================================
// Settlement
// ============================================================================

/// A settlement request, tagged by mode
///
/// A bill commits to one mode with its first settlement; the engine
/// rejects requests in the other mode until the bill completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementRequest {
    /// Even split: claim one share of the discounted total
    Split(SplitPaymentRequest),
    /// Itemized: pay for selected line quantities
    Itemized(ItemizedPaymentRequest),
}

impl SettlementRequest {
    /// Root bill targeted by this request
    pub fn bill_id(&self) -> &str {
        match self {
            SettlementRequest::Split(req) => &req.bill_id,
            SettlementRequest::Itemized(req) => &req.bill_id,
        }
    }

    /// Run field-level validation for the wrapped request
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            SettlementRequest::Split(req) => req.validate(),
            SettlementRequest::Itemized(req) => req.validate(),
        }
    }
}

/// Claim one share of an even split
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SplitPaymentRequest {
    /// Root bill to settle
    #[validate(length(min = 1, message = "bill_id is required"))]
    pub bill_id: String,
    /// Number of shares the bill is divided into
    #[validate(range(min = 1, message = "split_count must be at least 1"))]
    pub split_count: u32,
    /// Which share this request claims (1-based)
    #[validate(range(min = 1, message = "split_index must be at least 1"))]
    pub split_index: u32,
    /// Payment method used
    #[validate(length(min = 1, message = "payment_method_id is required"))]
    pub payment_method_id: String,
    /// Cashier taking the payment
    #[validate(length(min = 1, message = "cashier_id is required"))]
    pub cashier_id: String,
    /// Amount tendered
    #[validate(range(min = 0, message = "deposit cannot be negative"))]
    pub deposit: i64,
    /// Settlement timestamp supplied by the terminal
    pub settled_at: i64,
}

/// Pay for selected line quantities
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ItemizedPaymentRequest {
    /// Root bill to settle
    #[validate(length(min = 1, message = "bill_id is required"))]
    pub bill_id: String,
    /// Lines and quantities this payment covers
    #[validate(length(min = 1, message = "at least one line selection is required"))]
    #[validate(nested)]
    pub selections: Vec<LineSelection>,
    /// Payment method used
    #[validate(length(min = 1, message = "payment_method_id is required"))]
    pub payment_method_id: String,
    /// Cashier taking the payment
    #[validate(length(min = 1, message = "cashier_id is required"))]
    pub cashier_id: String,
    /// Amount tendered
    #[validate(range(min = 0, message = "deposit cannot be negative"))]
    pub deposit: i64,
    /// Discount applied to this fragment
    #[validate(range(min = 0, message = "discount cannot be negative"))]
    pub discount: i64,
    /// Settlement timestamp supplied by the terminal
    pub settled_at: i64,
}

/// One line quantity inside an itemized payment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineSelection {
    /// Line on the root bill
    #[validate(length(min = 1, message = "line_id is required"))]
    pub line_id: String,
    /// Quantity to pay for
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
}

// ============================================================================
// Bill Composition
// ============================================================================

/// Add a line to an open bill
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineInput {
    /// Menu item reference
    #[validate(length(min = 1, message = "item_ref is required"))]
    pub item_ref: String,
    /// Item display name
    #[validate(length(min = 1, message = "item_name is required"))]
    pub item_name: String,
    /// Quantity ordered
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    /// Pre-tax amount for the whole quantity
    #[validate(range(min = 0, message = "subtotal cannot be negative"))]
    pub subtotal: i64,
    /// Tax bucket
    pub tax_bucket: TaxBucket,
    /// Line-level discount (pre-tax)
    #[serde(default)]
    #[validate(range(min = 0, message = "line_discount cannot be negative"))]
    pub line_discount: i64,
}

// ============================================================================
// Receipts
// ============================================================================

/// Receipt coverage mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptMode {
    /// Cover the entire remaining balance
    Full,
    /// Cover a caller-specified amount
    Amount,
}

/// Issue a receipt against a bill
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptIssueRequest {
    /// Bill to issue against
    #[validate(length(min = 1, message = "bill_id is required"))]
    pub bill_id: String,
    /// Coverage mode
    pub mode: ReceiptMode,
    /// Amount to cover (required when mode is AMOUNT)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: Option<i64>,
    /// User issuing the receipt
    #[validate(length(min = 1, message = "issuer_id is required"))]
    pub issuer_id: String,
    /// Key for exactly-once issuance across retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Void an issued receipt
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptVoidRequest {
    /// Receipt to void
    #[validate(length(min = 1, message = "receipt_id is required"))]
    pub receipt_id: String,
    /// User performing the void
    #[validate(length(min = 1, message = "voided_by is required"))]
    pub voided_by: String,
}

/// Query the remaining issuable balance of a bill
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemainingBalanceQuery {
    /// Bill to inspect
    #[validate(length(min = 1, message = "bill_id is required"))]
    pub bill_id: String,
}
