//! Error responses for the HTTP API.
//!
//! Every context error maps onto `{code, message}` with its own status.
//! Storage failures never leak their internals to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::application::CheckoutError;
use crate::domain::access::AccessError;
use crate::domain::ledger::TransactionError;
use crate::domain::messaging::MessagingError;
use crate::domain::webhook::WebhookError;

const STORAGE_MESSAGE: &str = "A temporary error occurred, please retry";

/// Standard error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error: a status plus the body to send.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, message),
        }
    }

    pub fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "authentication_required",
            "Authentication is required",
        )
    }

    pub fn forbidden(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.body = self.body.with_details(details);
        self
    }

    fn storage(error: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %error, "request failed on storage");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", STORAGE_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Storage(_) => Self::storage(&err),
            _ => Self::new(err.status_code(), err.code(), err.to_string()),
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        let code = match &err {
            TransactionError::UnknownType(_) => "invalid_transaction_type",
            TransactionError::UnknownStatus(_) => "invalid_status",
            TransactionError::InvalidAmount(_) => "invalid_amount",
            TransactionError::InvalidCurrency(_) => "invalid_currency",
            TransactionError::NotFound(_) => "transaction_not_found",
            TransactionError::DuplicateReference(_) => "duplicate_provider_reference",
            TransactionError::Storage(_) => return Self::storage(&err),
        };
        Self::new(err.status_code(), code, err.to_string())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Storage(_) => Self::storage(&err),
            CheckoutError::Ledger(inner) => Self::from(inner),
            CheckoutError::Payment(ref payment) => Self::new(
                err.status_code(),
                err.code(),
                if payment.retryable {
                    "The payment provider is unavailable, please try again shortly"
                } else {
                    "The payment provider rejected the checkout"
                },
            ),
            _ => Self::new(err.status_code(), err.code(), err.to_string()),
        }
    }
}

impl From<MessagingError> for ApiError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::Storage(_) => Self::storage(&err),
            _ => Self::new(err.status_code(), err.code(), err.to_string()),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Storage(_) => Self {
                status: err.status_code(),
                body: ErrorResponse::new(err.code(), STORAGE_MESSAGE),
            },
            _ => Self::new(err.status_code(), err.code(), err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ListingId;

    #[test]
    fn storage_details_are_hidden() {
        let err = ApiError::from(AccessError::Storage("connection refused to 10.0.0.5".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.code, "storage_error");
        assert!(!err.body.message.contains("10.0.0.5"));
    }

    #[test]
    fn checkout_conflict_keeps_actionable_message() {
        let err = ApiError::from(CheckoutError::AlreadyHasAccess);
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.body.code, "already_has_access");
        assert_eq!(
            err.body.message,
            "You already have access to this listing's contact details"
        );
    }

    #[test]
    fn messaging_access_required_is_forbidden() {
        let err = ApiError::from(MessagingError::AccessRequired {
            listing_id: ListingId::new(7),
        });
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.body.code, "access_required");
    }

    #[test]
    fn webhook_storage_failure_is_retryable_status() {
        let err = ApiError::from(WebhookError::Storage("deadlock".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.body.message.contains("deadlock"));
    }
}
