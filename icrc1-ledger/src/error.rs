//! Error types for the ledger

use crate::types::Tokens;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// These are faults of the ledger itself or of its configuration. Rejected
/// transfers are reported through [`TransferError`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid principal bytes
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(String),

    /// Malformed account key
    #[error("Invalid account key: {0}")]
    InvalidAccountKey(String),

    /// Invariant violation (conservation, overflow)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

/// Reasons a transfer is rejected
///
/// A rejected transfer never changes any balance and never consumes a
/// transaction index.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferError {
    /// Requested fee differs from the configured fee
    #[error("Bad fee: expected {expected_fee}")]
    BadFee {
        /// Configured fee
        expected_fee: Tokens,
    },

    /// Sender cannot cover amount plus fee
    #[error("Insufficient funds: balance is {balance}")]
    InsufficientFunds {
        /// Sender balance at the time of the request
        balance: Tokens,
    },

    /// Destination account is not allowed to receive funds
    #[error("Invalid receiver")]
    InvalidReceiver,

    /// Memo exceeds the configured ceiling
    #[error("Memo too long: maximum is {max_length} bytes")]
    MemoTooLong {
        /// Configured ceiling in bytes
        max_length: usize,
    },

    /// Ledger halted after an internal fault
    #[error("Ledger temporarily unavailable")]
    TemporarilyUnavailable,
}

impl TransferError {
    /// Short label used for metrics and logs
    pub fn reason(&self) -> &'static str {
        match self {
            TransferError::BadFee { .. } => "bad_fee",
            TransferError::InsufficientFunds { .. } => "insufficient_funds",
            TransferError::InvalidReceiver => "invalid_receiver",
            TransferError::MemoTooLong { .. } => "memo_too_long",
            TransferError::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_display() {
        let err = TransferError::BadFee {
            expected_fee: Tokens::from(1_000u64),
        };
        assert_eq!(err.to_string(), "Bad fee: expected 1000");

        let err = TransferError::InsufficientFunds {
            balance: Tokens::from(7u64),
        };
        assert_eq!(err.to_string(), "Insufficient funds: balance is 7");
    }

    #[test]
    fn test_transfer_error_reason_labels() {
        assert_eq!(TransferError::InvalidReceiver.reason(), "invalid_receiver");
        assert_eq!(
            TransferError::MemoTooLong { max_length: 32 }.reason(),
            "memo_too_long"
        );
    }
}
