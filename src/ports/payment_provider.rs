//! Payment provider port for hosted checkout.
//!
//! The provider collects card details on its own page; the ledger only asks
//! for a session and later learns the outcome from webhooks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, ListingId, TransactionId, UserId};
use crate::domain::ledger::{Currency, TransactionType};

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a hosted checkout session.
    ///
    /// `request.metadata()` must be echoed back verbatim in the provider's
    /// webhook payloads for this session.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

/// Request to create a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub transaction_id: TransactionId,
    pub buyer_id: UserId,
    pub listing_id: ListingId,
    pub payment_type: TransactionType,
    /// Price in the currency's minor units.
    pub amount_minor: i64,
    pub currency: Currency,
    pub description: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    /// Correlation metadata, as string pairs.
    pub fn metadata(&self) -> Vec<(&'static str, String)> {
        vec![
            ("transaction_id", self.transaction_id.to_string()),
            ("user_id", self.buyer_id.to_string()),
            ("listing_id", self.listing_id.to_string()),
            ("payment_type", self.payment_type.as_str().to_string()),
        ]
    }

    /// Idempotency key for the provider call; one session per transaction.
    pub fn idempotency_key(&self) -> String {
        format!("checkout-{}", self.transaction_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider session id (`cs_...`).
    pub id: String,
    /// Hosted checkout page.
    pub url: String,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Provider's own error code, if it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(ErrorCode::InternalError, err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    RateLimitExceeded,
    InvalidRequest,
    ProviderError,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            transaction_id: TransactionId::new(101),
            buyer_id: UserId::new(42),
            listing_id: ListingId::new(7),
            payment_type: TransactionType::ContactReveal,
            amount_minor: 500,
            currency: Currency::new("USD").unwrap(),
            description: "Contact details for listing 7".into(),
            success_url: "https://example.com/ok".into(),
            cancel_url: "https://example.com/cancel".into(),
        }
    }

    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn metadata_carries_correlation_ids() {
        let metadata = request().metadata();
        assert!(metadata.contains(&("transaction_id", "101".to_string())));
        assert!(metadata.contains(&("user_id", "42".to_string())));
        assert!(metadata.contains(&("listing_id", "7".to_string())));
        assert!(metadata.contains(&("payment_type", "contact_reveal".to_string())));
    }

    #[test]
    fn idempotency_key_is_per_transaction() {
        assert_eq!(request().idempotency_key(), "checkout-101");
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentError::network("timeout").retryable);
        assert!(!PaymentError::authentication("bad key").retryable);
        assert!(!PaymentError::invalid_request("amount too small").retryable);
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::invalid_request("Amount must be at least 50 cents");
        assert_eq!(
            err.to_string(),
            "invalid_request: Amount must be at least 50 cents"
        );
    }
}
