//! Failures while reading or checking settings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A setting that parsed but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    #[error("server port must be non-zero")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("request timeout must be between 1 and 300 seconds")]
    InvalidTimeout,

    #[error("database url must start with postgres:// or postgresql://")]
    InvalidDatabaseUrl,

    #[error("database pool minimum is above its maximum")]
    InvalidPoolSize,

    #[error("database pool maximum is above 100 connections")]
    PoolSizeTooLarge,

    #[error("Stripe API key must start with sk_")]
    InvalidStripeKey,

    #[error("Stripe webhook secret must start with whsec_")]
    InvalidStripeWebhookSecret,

    #[error("Unsigned webhooks cannot be allowed in production")]
    UnsignedWebhooksInProduction,

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Price for {0} must be greater than zero")]
    InvalidPrice(&'static str),

    #[error("Invalid redirect URL for {0}")]
    InvalidRedirectUrl(&'static str),

    #[error("Invalid admin user id: {0}")]
    InvalidAdminId(String),

    #[error("{0} must be at least {1}")]
    OutOfRange(&'static str, i64),
}
