//! Access grant error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, GrantId, ListingId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("User {0} does not exist")]
    InvalidBuyer(UserId),

    #[error("Listing {0} does not exist")]
    InvalidListing(ListingId),

    /// Owners already see their own contact details.
    #[error("Listing owners cannot be granted access to their own listing")]
    SelfGrantDenied,

    #[error("Grant expiry must be after the grant time")]
    InvalidExpiry,

    #[error("Access grant {0} not found")]
    GrantNotFound(GrantId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AccessError {
    /// Machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::InvalidBuyer(_) => "invalid_buyer",
            AccessError::InvalidListing(_) => "invalid_listing",
            AccessError::SelfGrantDenied => "self_grant_denied",
            AccessError::InvalidExpiry => "invalid_expiry",
            AccessError::GrantNotFound(_) => "grant_not_found",
            AccessError::Storage(_) => "storage_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::Storage(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AccessError::InvalidBuyer(_)
            | AccessError::InvalidListing(_)
            | AccessError::GrantNotFound(_) => StatusCode::NOT_FOUND,
            AccessError::SelfGrantDenied => StatusCode::FORBIDDEN,
            AccessError::InvalidExpiry => StatusCode::BAD_REQUEST,
            AccessError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for AccessError {
    fn from(err: DomainError) -> Self {
        AccessError::Storage(err.to_string())
    }
}
