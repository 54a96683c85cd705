//! Shared types for the settlement engine
//!
//! Common types used across crates: billing domain models, settlement
//! request/response contracts, events, and wire error codes.

pub mod billing;
pub mod error;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Billing re-exports (for convenient access)
pub use billing::{Bill, BillLine, BillStatus, Receipt, TaxBucket, TaxRates, Visit};
pub use billing::{ReceiptIssueRequest, ReceiptMode, SettlementRequest};

// Error re-exports
pub use error::{ErrorCode, SettlementFault};
