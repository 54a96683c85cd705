//! Billing domain types
//!
//! This module provides the contracts for bill settlement and receipt
//! issuance:
//! - Types: persisted bill, line, receipt, and visit records
//! - Requests: settlement and receipt operations sent by terminals
//! - Responses: read-model views assembled for terminals
//! - Events: facts broadcast after a settlement commits

pub mod event;
pub mod request;
pub mod response;
pub mod types;

// Re-exports
pub use event::{SettlementEvent, SettlementEventKind};
pub use request::{
    ItemizedPaymentRequest, LineInput, LineSelection, ReceiptIssueRequest, ReceiptMode,
    ReceiptVoidRequest, RemainingBalanceQuery, SettlementRequest, SplitPaymentRequest,
};
pub use response::{
    BillSummary, BucketBreakdown, ChildSettlement, ReceiptView, RemainingBalance,
    RemainingSettlement, UnpaidLine,
};
pub use types::{Bill, BillLine, BillStatus, Receipt, TaxBucket, TaxRates, Visit};
