//! Messaging error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ListingId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// Sender has not bought contact access for the listing.
    #[error("You need to unlock this listing's contact details before messaging the seller")]
    AccessRequired { listing_id: ListingId },

    #[error("Listing {0} does not exist")]
    ListingNotFound(ListingId),

    #[error("Message body must not be empty")]
    EmptyBody,

    #[error("Message body exceeds {max} characters")]
    BodyTooLong { max: usize },

    /// Owners must name the buyer they are replying to; nobody messages themselves.
    #[error("Message recipient is missing or invalid")]
    InvalidRecipient,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl MessagingError {
    pub fn code(&self) -> &'static str {
        match self {
            MessagingError::AccessRequired { .. } => "access_required",
            MessagingError::ListingNotFound(_) => "invalid_listing",
            MessagingError::EmptyBody | MessagingError::BodyTooLong { .. } => "invalid_message",
            MessagingError::InvalidRecipient => "invalid_recipient",
            MessagingError::Storage(_) => "storage_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MessagingError::AccessRequired { .. } => StatusCode::FORBIDDEN,
            MessagingError::ListingNotFound(_) => StatusCode::NOT_FOUND,
            MessagingError::EmptyBody
            | MessagingError::BodyTooLong { .. }
            | MessagingError::InvalidRecipient => StatusCode::BAD_REQUEST,
            MessagingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for MessagingError {
    fn from(err: DomainError) -> Self {
        MessagingError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_required_is_forbidden() {
        let err = MessagingError::AccessRequired {
            listing_id: ListingId::new(7),
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "access_required");
    }

    #[test]
    fn validation_failures_are_bad_requests() {
        assert_eq!(MessagingError::EmptyBody.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            MessagingError::BodyTooLong { max: 10 }.to_string(),
            "Message body exceeds 10 characters"
        );
    }
}
