//! Checkout error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::access::AccessError;
use crate::domain::foundation::{DomainError, ListingId};
use crate::domain::ledger::TransactionError;
use crate::ports::PaymentError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Listing {0} does not exist")]
    InvalidListing(ListingId),

    #[error("You cannot pay for access to your own listing")]
    SelfPurchaseDenied,

    #[error("You already have access to this listing's contact details")]
    AlreadyHasAccess,

    #[error("Unknown payment type: {0}")]
    InvalidPaymentType(String),

    /// The provider refused or could not be reached; the pending row is marked failed.
    #[error("Payment provider error: {0}")]
    Payment(PaymentError),

    #[error("Ledger error: {0}")]
    Ledger(TransactionError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CheckoutError {
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::InvalidListing(_) => "invalid_listing",
            CheckoutError::SelfPurchaseDenied => "self_purchase_denied",
            CheckoutError::AlreadyHasAccess => "already_has_access",
            CheckoutError::InvalidPaymentType(_) => "invalid_payment_type",
            CheckoutError::Payment(_) => "payment_provider_error",
            CheckoutError::Ledger(_) => "ledger_error",
            CheckoutError::Storage(_) => "storage_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::Payment(e) => e.retryable,
            CheckoutError::Ledger(e) => e.is_retryable(),
            CheckoutError::Storage(_) => true,
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CheckoutError::InvalidListing(_) => StatusCode::NOT_FOUND,
            CheckoutError::SelfPurchaseDenied => StatusCode::FORBIDDEN,
            CheckoutError::AlreadyHasAccess => StatusCode::CONFLICT,
            CheckoutError::InvalidPaymentType(_) => StatusCode::BAD_REQUEST,
            CheckoutError::Payment(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::Ledger(e) => e.status_code(),
            CheckoutError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        CheckoutError::Storage(err.to_string())
    }
}

impl From<TransactionError> for CheckoutError {
    fn from(err: TransactionError) -> Self {
        CheckoutError::Ledger(err)
    }
}

impl From<AccessError> for CheckoutError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::InvalidListing(id) => CheckoutError::InvalidListing(id),
            AccessError::SelfGrantDenied => CheckoutError::SelfPurchaseDenied,
            other => CheckoutError::Storage(other.to_string()),
        }
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(err: PaymentError) -> Self {
        CheckoutError::Payment(err)
    }
}
