//! Engine errors and their mapping to wire faults

use crate::storage::StorageError;
use shared::error::{ErrorCode, SettlementFault};
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Bill not found: {0}")]
    BillNotFound(String),

    #[error("Line not found: {0}")]
    LineNotFound(String),

    #[error("Visit not found: {0}")]
    VisitNotFound(String),

    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Settlement mode conflict: {0}")]
    ModeConflict(String),

    #[error("Split share claimed out of order: expected index {expected}, got {got}")]
    SequenceViolation { expected: u32, got: u32 },

    #[error("Insufficient deposit: share is {required}, tendered {tendered}")]
    InsufficientDeposit { required: i64, tendered: i64 },

    #[error("Settlement would exceed the bill total: total {total}, attempted {attempted}")]
    OverPayment { total: i64, attempted: i64 },

    #[error("Quantity unavailable on line {line_id}: {available} left, requested {requested}")]
    QuantityUnavailable {
        line_id: String,
        available: u32,
        requested: u32,
    },

    #[error("Split count {split_count} exceeds party size {party_size}")]
    InvalidSplitCount { party_size: u32, split_count: u32 },

    #[error("Amount exceeds remaining balance: {remaining} remaining, requested {requested}")]
    AmountExceedsRemaining { remaining: i64, requested: i64 },

    #[error("Receipt already voided: {0}")]
    AlreadyVoided(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SettlementResult<T> = Result<T, SettlementError>;

impl From<validator::ValidationErrors> for SettlementError {
    fn from(errors: validator::ValidationErrors) -> Self {
        SettlementError::Validation(errors.to_string())
    }
}

/// Classify a storage error into a wire code
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    if let StorageError::Serialization(_) = e {
        return ErrorCode::StorageFailure;
    }

    // redb errors are classified by message
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc") {
        return ErrorCode::StorageFull;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    ErrorCode::StorageFailure
}

impl From<SettlementError> for SettlementFault {
    fn from(err: SettlementError) -> Self {
        let (code, message) = match err {
            SettlementError::Storage(e) => {
                let code = classify_storage_error(&e);
                // Keep the technical detail for logs, not just the wire code
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                (code, e.to_string())
            }
            SettlementError::Validation(msg) => (ErrorCode::ValidationFailed, msg),
            SettlementError::BillNotFound(id) => {
                (ErrorCode::NotFound, format!("Bill not found: {}", id))
            }
            SettlementError::LineNotFound(id) => {
                (ErrorCode::NotFound, format!("Line not found: {}", id))
            }
            SettlementError::VisitNotFound(id) => {
                (ErrorCode::NotFound, format!("Visit not found: {}", id))
            }
            SettlementError::ReceiptNotFound(id) => {
                (ErrorCode::NotFound, format!("Receipt not found: {}", id))
            }
            SettlementError::UserNotFound(id) => {
                (ErrorCode::NotFound, format!("User not found: {}", id))
            }
            SettlementError::ModeConflict(msg) => (ErrorCode::ModeConflict, msg),
            err @ SettlementError::SequenceViolation { .. } => {
                (ErrorCode::SequenceViolation, err.to_string())
            }
            err @ SettlementError::InsufficientDeposit { .. } => {
                (ErrorCode::InsufficientDeposit, err.to_string())
            }
            err @ SettlementError::OverPayment { .. } => (ErrorCode::OverPayment, err.to_string()),
            err @ SettlementError::QuantityUnavailable { .. } => {
                (ErrorCode::QuantityUnavailable, err.to_string())
            }
            err @ SettlementError::InvalidSplitCount { .. } => {
                (ErrorCode::InvalidSplitCount, err.to_string())
            }
            err @ SettlementError::AmountExceedsRemaining { .. } => {
                (ErrorCode::AmountExceedsRemaining, err.to_string())
            }
            SettlementError::AlreadyVoided(id) => (
                ErrorCode::AlreadyVoided,
                format!("Receipt already voided: {}", id),
            ),
            SettlementError::Internal(msg) => (ErrorCode::Unknown, msg),
        };
        SettlementFault::with_message(code, message)
    }
}
