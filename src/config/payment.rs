//! Payment configuration

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::ledger::{Currency, TransactionType};

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key. Without one, development runs use the mock provider.
    pub stripe_api_key: Option<SecretString>,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: Option<SecretString>,

    /// Override for the Stripe API base URL
    pub stripe_api_base_url: Option<String>,

    /// ISO 4217 code all prices are charged in
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Price per payment type
    #[serde(default)]
    pub prices: PriceTable,

    /// Where the hosted checkout returns after payment
    #[serde(default = "default_success_url")]
    pub success_url: String,

    /// Where the hosted checkout returns on cancel
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,

    /// Accept webhooks without a signing secret (local development only)
    #[serde(default)]
    pub allow_unsigned_webhooks: bool,

    /// Reject provider events whose livemode flag is false
    #[serde(default)]
    pub require_livemode: bool,
}

/// Configured price for each payment type, in major units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PriceTable {
    #[serde(default = "default_contact_reveal_price")]
    pub contact_reveal: Decimal,

    #[serde(default = "default_listing_boost_price")]
    pub listing_boost: Decimal,

    #[serde(default = "default_subscription_price")]
    pub subscription: Decimal,
}

impl PriceTable {
    pub fn price_for(&self, payment_type: TransactionType) -> Decimal {
        match payment_type {
            TransactionType::ContactReveal => self.contact_reveal,
            TransactionType::ListingBoost => self.listing_boost,
            TransactionType::Subscription => self.subscription,
        }
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            contact_reveal: default_contact_reveal_price(),
            listing_boost: default_listing_boost_price(),
            subscription: default_subscription_price(),
        }
    }
}

/// Validated prices together with the currency they are charged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pricing {
    pub currency: Currency,
    pub prices: PriceTable,
}

impl Pricing {
    pub fn new(currency: Currency, prices: PriceTable) -> Self {
        Self { currency, prices }
    }

    pub fn price_for(&self, payment_type: TransactionType) -> Decimal {
        self.prices.price_for(payment_type)
    }
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.api_key().is_some_and(|key| key.starts_with("sk_test_"))
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.api_key().is_some_and(|key| key.starts_with("sk_live_"))
    }

    /// Webhook secret as a plain string, when one is configured.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.stripe_webhook_secret
            .as_ref()
            .map(|secret| secret.expose_secret().as_str())
            .filter(|secret| !secret.trim().is_empty())
    }

    /// Currency and price table, validated.
    pub fn pricing(&self) -> Result<Pricing, ValidationError> {
        let currency = Currency::new(&self.currency)
            .map_err(|_| ValidationError::InvalidCurrency(self.currency.clone()))?;

        for payment_type in TransactionType::ALL {
            if self.prices.price_for(payment_type) <= Decimal::ZERO {
                return Err(ValidationError::InvalidPrice(payment_type.as_str()));
            }
        }

        Ok(Pricing::new(currency, self.prices))
    }

    /// Validate payment configuration
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        match self.api_key() {
            Some(key) if !key.starts_with("sk_") => {
                return Err(ValidationError::InvalidStripeKey);
            }
            None if production => {
                return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
            }
            _ => {}
        }

        match self.webhook_secret() {
            Some(secret) if !secret.starts_with("whsec_") => {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
            None if production => {
                return Err(ValidationError::MissingRequired(
                    "PAYMENT__STRIPE_WEBHOOK_SECRET",
                ));
            }
            _ => {}
        }

        if production && self.allow_unsigned_webhooks {
            return Err(ValidationError::UnsignedWebhooksInProduction);
        }

        if !is_http_url(&self.success_url) {
            return Err(ValidationError::InvalidRedirectUrl("success_url"));
        }
        if !is_http_url(&self.cancel_url) {
            return Err(ValidationError::InvalidRedirectUrl("cancel_url"));
        }

        self.pricing()?;
        Ok(())
    }

    /// Configured secret key, if any and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.stripe_api_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: None,
            stripe_webhook_secret: None,
            stripe_api_base_url: None,
            currency: default_currency(),
            prices: PriceTable::default(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            allow_unsigned_webhooks: false,
            require_livemode: false,
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_contact_reveal_price() -> Decimal {
    Decimal::new(500, 2)
}

fn default_listing_boost_price() -> Decimal {
    Decimal::new(1000, 2)
}

fn default_subscription_price() -> Decimal {
    Decimal::new(2900, 2)
}

fn default_success_url() -> String {
    "http://localhost:5173/checkout/success?session_id={CHECKOUT_SESSION_ID}".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:5173/checkout/cancelled".to_string()
}
