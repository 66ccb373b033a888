//! Transaction ledger error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, TransactionId};

/// Errors raised while recording or transitioning transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// Type outside {contact_reveal, listing_boost, subscription}.
    #[error("Unknown transaction type: {0}")]
    UnknownType(String),

    /// Status outside {pending, completed, failed, refunded}.
    #[error("Unknown transaction status: {0}")]
    UnknownStatus(String),

    /// Amount is negative or not representable.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency is not a 3-letter ISO code.
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// Referenced transaction does not exist.
    #[error("Transaction {0} not found")]
    NotFound(TransactionId),

    /// Another transaction already carries this provider reference.
    #[error("Duplicate provider reference: {0}")]
    DuplicateReference(String),

    /// Ledger storage failed; safe to retry.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TransactionError {
    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransactionError::Storage(_))
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            TransactionError::UnknownType(_)
            | TransactionError::UnknownStatus(_)
            | TransactionError::InvalidAmount(_)
            | TransactionError::InvalidCurrency(_) => StatusCode::BAD_REQUEST,
            TransactionError::NotFound(_) => StatusCode::NOT_FOUND,
            TransactionError::DuplicateReference(_) => StatusCode::CONFLICT,
            TransactionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for TransactionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DuplicateProviderReference => {
                TransactionError::DuplicateReference(err.message)
            }
            _ => TransactionError::Storage(err.to_string()),
        }
    }
}
