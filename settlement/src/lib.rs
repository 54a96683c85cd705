//! Bill settlement and receipt issuance engine
//!
//! This crate implements the payment-side core of a restaurant POS:
//! splitting a visit's bill into settled fragments (even shares or
//! itemized selections) and issuing tax-compliant receipts against the
//! settled amounts.
//!
//! # Module Structure
//!
//! ```text
//! settlement/src/
//! ├── bills/       # Settlement: money rules, actions, bill manager
//! ├── receipts/    # Receipt ledger and two-bucket tax apportionment
//! ├── storage.rs   # redb-based persistence layer
//! ├── directory.rs # Issuer/cashier display-name resolution
//! ├── notify.rs    # Visit checkout notifications
//! ├── clock.rs     # Injectable time source
//! ├── config.rs    # Environment configuration
//! └── utils/       # Logging setup
//! ```
//!
//! # Data Flow
//!
//! 1. Terminal sends a SettlementRequest
//! 2. BillManager validates and applies it in one write transaction
//! 3. On commit, a SettlementEvent is broadcast to subscribers
//! 4. ReceiptLedger issues receipts against the settled bill
//! 5. Completing the root bill checks the visit out and signals seating

pub mod bills;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod notify;
pub mod receipts;
pub mod storage;
pub mod utils;

// Re-export public types
pub use bills::BillManager;
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use error::{SettlementError, SettlementResult};
pub use notify::{BroadcastVisitNotifier, VisitNotifier, VisitSettled};
pub use receipts::ReceiptLedger;
pub use storage::LedgerStorage;

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
