//! Marketplace configuration

use serde::Deserialize;

use crate::domain::foundation::UserId;

use super::error::ValidationError;

/// Marketplace behaviour that the ledger depends on.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    /// Listings awaiting moderation can be purchased against
    #[serde(default)]
    pub auto_approve_listings: bool,

    /// How long a paid boost keeps a listing featured
    #[serde(default = "default_boost_duration_days")]
    pub boost_duration_days: i64,

    /// Lifetime of a subscription grant
    #[serde(default = "default_subscription_access_days")]
    pub subscription_access_days: i64,

    /// Users with admin rights (comma-separated ids)
    pub admin_user_ids: Option<String>,
}

impl MarketplaceConfig {
    /// Parse the admin id list. Blank entries are skipped.
    pub fn admin_ids(&self) -> Result<Vec<UserId>, ValidationError> {
        let Some(raw) = self.admin_user_ids.as_deref() else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                id.parse::<UserId>()
                    .map_err(|_| ValidationError::InvalidAdminId(id.to_string()))
            })
            .collect()
    }

    /// Validate marketplace configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.boost_duration_days < 1 {
            return Err(ValidationError::OutOfRange("boost_duration_days", 1));
        }
        if self.subscription_access_days < 1 {
            return Err(ValidationError::OutOfRange("subscription_access_days", 1));
        }
        self.admin_ids()?;
        Ok(())
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            auto_approve_listings: false,
            boost_duration_days: default_boost_duration_days(),
            subscription_access_days: default_subscription_access_days(),
            admin_user_ids: None,
        }
    }
}

fn default_boost_duration_days() -> i64 {
    7
}

fn default_subscription_access_days() -> i64 {
    30
}
