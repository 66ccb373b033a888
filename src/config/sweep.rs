//! Background sweep configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Schedule and retention windows for the background sweeper.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Run the sweeper at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Failed and refunded transactions older than this are purged
    #[serde(default = "default_transaction_retention_days")]
    pub transaction_retention_days: i64,

    /// Processed webhook journal entries older than this are purged
    #[serde(default = "default_webhook_event_retention_days")]
    pub webhook_event_retention_days: i64,
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate sweep configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs < 60 {
            return Err(ValidationError::OutOfRange("sweep interval_secs", 60));
        }
        if self.transaction_retention_days < 1 {
            return Err(ValidationError::OutOfRange("transaction_retention_days", 1));
        }
        if self.webhook_event_retention_days < 1 {
            return Err(ValidationError::OutOfRange("webhook_event_retention_days", 1));
        }
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            transaction_retention_days: default_transaction_retention_days(),
            webhook_event_retention_days: default_webhook_event_retention_days(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    86_400
}

fn default_transaction_retention_days() -> i64 {
    365
}

fn default_webhook_event_retention_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(86_400));
        assert_eq!(config.transaction_retention_days, 365);
        assert_eq!(config.webhook_event_retention_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_lower_bound() {
        let config = SweepConfig {
            interval_secs: 5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::OutOfRange("sweep interval_secs", 60))
        );
    }
}
