//! Bill settlement
//!
//! This module implements bill splitting and settlement:
//!
//! - **manager**: Core BillManager for settlement processing and queries
//! - **actions**: One action per settlement mode, dispatched from requests
//! - **money**: Integer minor-unit arithmetic with decimal tax math
//!
//! # Data Flow
//!
//! 1. Terminal sends a SettlementRequest
//! 2. BillManager validates it and dispatches the matching action
//! 3. The action checks mode, sequence, and funds, then writes the fragment
//! 4. The final fragment aggregates the root and checks the visit out
//! 5. The committed settlement is broadcast to subscribers

pub mod actions;
pub mod manager;
pub mod money;

// Re-exports
pub use manager::BillManager;
