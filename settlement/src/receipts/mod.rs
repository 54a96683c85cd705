//! Receipt issuance and tax apportionment
//!
//! Receipts record the net/tax decomposition of what a customer paid,
//! split across the standard and reduced tax buckets:
//! - **apportion**: pure bucket math (proportional allocation, rounding
//!   reconciliation, bill-discount spreading)
//! - **ledger**: issuance, reprint, and void against stored bills

pub mod apportion;
pub mod ledger;

pub use apportion::{apportion, bucket_totals, TaxSplit};
pub use ledger::ReceiptLedger;
