//! Webhook error types.
//!
//! Status codes drive the provider's retry behavior: 2xx acknowledges, 4xx is
//! dropped, 5xx is redelivered later.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::access::AccessError;
use crate::domain::foundation::DomainError;
use crate::domain::ledger::TransactionError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed more than five minutes ago.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Parse error: {0}")]
    ParseError(String),

    /// No signing secret and unsigned events not allowed.
    #[error("Webhook signing secret is not configured")]
    SecretNotConfigured,

    #[error("Event livemode does not match this deployment")]
    LivemodeMismatch,

    /// Recognized event type whose object lacks a required field.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Authenticated event the ledger cannot act on. Redelivery would not help.
    #[error("Unprocessable event: {0}")]
    Unprocessable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver the event.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Storage(_) | WebhookError::SecretNotConfigured
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::LivemodeMismatch
            | WebhookError::MalformedEvent(_)
            | WebhookError::Unprocessable(_) => StatusCode::BAD_REQUEST,

            WebhookError::SecretNotConfigured | WebhookError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => "invalid_signature",
            WebhookError::ParseError(_) | WebhookError::MalformedEvent(_) => "invalid_payload",
            WebhookError::Unprocessable(_) => "unprocessable_event",
            WebhookError::LivemodeMismatch => "livemode_mismatch",
            WebhookError::SecretNotConfigured => "webhook_not_configured",
            WebhookError::Storage(_) => "storage_error",
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}

impl From<TransactionError> for WebhookError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Storage(message) => WebhookError::Storage(message),
            other => WebhookError::Unprocessable(other.to_string()),
        }
    }
}

impl From<AccessError> for WebhookError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Storage(message) => WebhookError::Storage(message),
            other => WebhookError::Unprocessable(other.to_string()),
        }
    }
}
