//! Typed settings read from `CONTACT_LEDGER__*` environment variables.
//!
//! Sections nest with a double underscore, so
//! `CONTACT_LEDGER__PAYMENT__PRICES__CONTACT_REVEAL=5.00` sets
//! `payment.prices.contact_reveal`. A `.env` file is honoured in development.

mod database;
mod error;
mod marketplace;
mod payment;
mod server;
mod sweep;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use marketplace::MarketplaceConfig;
pub use payment::{PaymentConfig, PriceTable, Pricing};
pub use server::{Environment, LogFormat, ServerConfig};
pub use sweep::SweepConfig;

use serde::Deserialize;

const ENV_PREFIX: &str = "CONTACT_LEDGER";

/// Every section defaults, so an empty environment yields a development
/// setup on in-memory stores and the mock payment provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Stripe credentials, currency and price table
    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    /// Reads the environment (after `.env`) into typed sections.
    ///
    /// Only parse failures surface here; range and cross-field checks live
    /// in [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::debug!(error = %e, "ignoring unreadable .env file");
            }
        }

        let source = config::Environment::with_prefix(ENV_PREFIX).separator("__");
        Ok(config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let production = self.is_production();
        self.server.validate()?;
        self.database.validate(production)?;
        self.payment.validate(production)?;
        self.marketplace.validate()?;
        self.sweep.validate()
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
