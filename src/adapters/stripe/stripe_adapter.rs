//! Stripe checkout adapter.
//!
//! Implements `PaymentProvider` against the Stripe REST API. Only hosted
//! checkout sessions are created here; outcomes arrive through webhooks.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripeCheckoutAdapter::new(config)?;
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::ports::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode, PaymentProvider,
};

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` or `sk_test_...`).
    api_key: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Points the adapter at a different host (stripe-mock, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stripe checkout session adapter.
pub struct StripeCheckoutAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeCheckoutAdapter {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Form fields for `POST /v1/checkout/sessions`.
    ///
    /// Metadata is attached to both the session and its payment intent so
    /// every later event (including refunds) can be correlated.
    fn session_params(request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("client_reference_id".into(), request.transaction_id.to_string()),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "line_items[0][price_data][currency]".into(),
                request.currency.to_provider_code(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                request.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                request.description.clone(),
            ),
        ];

        for (key, value) in request.metadata() {
            params.push((format!("metadata[{}]", key), value.clone()));
            params.push((format!("payment_intent_data[metadata][{}]", key), value));
        }

        params
    }
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Maps a non-2xx Stripe response to a `PaymentError`.
fn error_from_response(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status));

    let code = match status.as_u16() {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        429 => PaymentErrorCode::RateLimitExceeded,
        400 | 402 | 404 => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match detail.and_then(|d| d.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

#[async_trait]
impl PaymentProvider for StripeCheckoutAdapter {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = Self::session_params(&request);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", request.idempotency_key())
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = error_from_response(status, &body);
            tracing::warn!(
                transaction_id = %request.transaction_id,
                status = status.as_u16(),
                code = %error.code,
                "Stripe rejected checkout session"
            );
            return Err(error);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })?;

        let url = session.url.ok_or_else(|| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                "Stripe returned a session without a checkout URL",
            )
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ListingId, TransactionId, UserId};
    use crate::domain::ledger::{Currency, TransactionType};

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            transaction_id: TransactionId::new(101),
            buyer_id: UserId::new(42),
            listing_id: ListingId::new(7),
            payment_type: TransactionType::ContactReveal,
            amount_minor: 500,
            currency: Currency::new("USD").unwrap(),
            description: "Seller contact details".into(),
            success_url: "https://example.com/ok".into(),
            cancel_url: "https://example.com/cancel".into(),
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn params_describe_one_time_payment() {
        let params = StripeCheckoutAdapter::session_params(&request());

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("500"));
        assert_eq!(param(&params, "client_reference_id"), Some("101"));
    }

    #[test]
    fn metadata_is_copied_to_payment_intent() {
        let params = StripeCheckoutAdapter::session_params(&request());

        assert_eq!(param(&params, "metadata[transaction_id]"), Some("101"));
        assert_eq!(
            param(&params, "payment_intent_data[metadata][transaction_id]"),
            Some("101")
        );
        assert_eq!(
            param(&params, "payment_intent_data[metadata][payment_type]"),
            Some("contact_reveal")
        );
    }

    #[test]
    fn stripe_error_body_is_mapped() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"amount_too_small","message":"Amount must be at least $0.50 usd"}}"#;

        let error = error_from_response(reqwest::StatusCode::BAD_REQUEST, body);

        assert_eq!(error.code, PaymentErrorCode::InvalidRequest);
        assert_eq!(error.provider_code.as_deref(), Some("amount_too_small"));
        assert!(error.message.contains("at least"));
    }

    #[test]
    fn rate_limits_are_retryable() {
        let error = error_from_response(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(error.retryable);
    }

    #[test]
    fn bad_key_is_authentication_error() {
        let error = error_from_response(reqwest::StatusCode::UNAUTHORIZED, "not json");
        assert_eq!(error.code, PaymentErrorCode::AuthenticationError);
        assert!(!error.retryable);
    }

    #[test]
    fn base_url_is_normalized() {
        let config = StripeConfig::new("sk_test_123").with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }
}
