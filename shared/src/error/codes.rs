//! Wire error codes for the settlement engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 5xxx: Settlement errors
//! - 6xxx: Receipt errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Codes are represented as u16 values for efficient serialization and
/// cross-language compatibility with terminal frontends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,

    // ==================== 5xxx: Settlement ====================
    /// Settlement mode conflicts with the mode already in progress
    ModeConflict = 5001,
    /// Split share claimed out of order
    SequenceViolation = 5002,
    /// Tendered amount does not cover the share
    InsufficientDeposit = 5003,
    /// Settlement would exceed the bill total
    OverPayment = 5004,
    /// Selected quantity exceeds what remains on the line
    QuantityUnavailable = 5005,
    /// Split count exceeds the recorded party size
    InvalidSplitCount = 5006,

    // ==================== 6xxx: Receipt ====================
    /// Requested amount exceeds the remaining issuable balance
    AmountExceedsRemaining = 6001,
    /// Receipt has already been voided
    AlreadyVoided = 6002,

    // ==================== 9xxx: System ====================
    /// Storage failure
    StorageFailure = 9001,
    /// Storage device is full
    StorageFull = 9002,
    /// Storage is corrupted
    StorageCorrupted = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",

            // Settlement
            ErrorCode::ModeConflict => "Settlement mode conflicts with the mode in progress",
            ErrorCode::SequenceViolation => "Split share claimed out of order",
            ErrorCode::InsufficientDeposit => "Tendered amount does not cover the share",
            ErrorCode::OverPayment => "Settlement would exceed the bill total",
            ErrorCode::QuantityUnavailable => "Selected quantity exceeds the remaining quantity",
            ErrorCode::InvalidSplitCount => "Split count exceeds the recorded party size",

            // Receipt
            ErrorCode::AmountExceedsRemaining => {
                "Requested amount exceeds the remaining issuable balance"
            }
            ErrorCode::AlreadyVoided => "Receipt has already been voided",

            // System
            ErrorCode::StorageFailure => "Storage failure",
            ErrorCode::StorageFull => "Storage device is full",
            ErrorCode::StorageCorrupted => "Storage is corrupted",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),

            // Settlement
            5001 => Ok(ErrorCode::ModeConflict),
            5002 => Ok(ErrorCode::SequenceViolation),
            5003 => Ok(ErrorCode::InsufficientDeposit),
            5004 => Ok(ErrorCode::OverPayment),
            5005 => Ok(ErrorCode::QuantityUnavailable),
            5006 => Ok(ErrorCode::InvalidSplitCount),

            // Receipt
            6001 => Ok(ErrorCode::AmountExceedsRemaining),
            6002 => Ok(ErrorCode::AlreadyVoided),

            // System
            9001 => Ok(ErrorCode::StorageFailure),
            9002 => Ok(ErrorCode::StorageFull),
            9003 => Ok(ErrorCode::StorageCorrupted),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Unknown.code(), 1);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::ModeConflict.code(), 5001);
        assert_eq!(ErrorCode::SequenceViolation.code(), 5002);
        assert_eq!(ErrorCode::InsufficientDeposit.code(), 5003);
        assert_eq!(ErrorCode::OverPayment.code(), 5004);
        assert_eq!(ErrorCode::QuantityUnavailable.code(), 5005);
        assert_eq!(ErrorCode::InvalidSplitCount.code(), 5006);
        assert_eq!(ErrorCode::AmountExceedsRemaining.code(), 6001);
        assert_eq!(ErrorCode::AlreadyVoided.code(), 6002);
        assert_eq!(ErrorCode::StorageFailure.code(), 9001);
        assert_eq!(ErrorCode::StorageFull.code(), 9002);
        assert_eq!(ErrorCode::StorageCorrupted.code(), 9003);
    }

    #[test]
    fn test_round_trip_conversion() {
        for code in [
            ErrorCode::Unknown,
            ErrorCode::ValidationFailed,
            ErrorCode::NotFound,
            ErrorCode::ModeConflict,
            ErrorCode::SequenceViolation,
            ErrorCode::InsufficientDeposit,
            ErrorCode::OverPayment,
            ErrorCode::QuantityUnavailable,
            ErrorCode::InvalidSplitCount,
            ErrorCode::AmountExceedsRemaining,
            ErrorCode::AlreadyVoided,
            ErrorCode::StorageFailure,
            ErrorCode::StorageFull,
            ErrorCode::StorageCorrupted,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code_rejected() {
        assert_eq!(ErrorCode::try_from(0), Err(InvalidErrorCode(0)));
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(7001), Err(InvalidErrorCode(7001)));
    }

    #[test]
    fn test_serde_as_u16() {
        let json = serde_json::to_string(&ErrorCode::OverPayment).unwrap();
        assert_eq!(json, "5004");
        let back: ErrorCode = serde_json::from_str("6002").unwrap();
        assert_eq!(back, ErrorCode::AlreadyVoided);
    }
}
