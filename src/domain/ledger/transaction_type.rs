//! What a payment buys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::TransactionError;
use crate::domain::access::AccessType;

/// Closed set of purchasable products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// One-time unlock of a listing's contact details.
    ContactReveal,
    /// Paid promotion of a listing to the featured slot.
    ListingBoost,
    /// Recurring plan that unlocks contact details while it lasts.
    Subscription,
}

impl TransactionType {
    pub const ALL: [TransactionType; 3] = [
        TransactionType::ContactReveal,
        TransactionType::ListingBoost,
        TransactionType::Subscription,
    ];

    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::ContactReveal => "contact_reveal",
            TransactionType::ListingBoost => "listing_boost",
            TransactionType::Subscription => "subscription",
        }
    }

    /// Access granted once a payment of this type completes, if any.
    pub fn access_type(&self) -> Option<AccessType> {
        match self {
            TransactionType::ContactReveal => Some(AccessType::ContactReveal),
            TransactionType::Subscription => Some(AccessType::Subscription),
            TransactionType::ListingBoost => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contact_reveal" => Ok(TransactionType::ContactReveal),
            "listing_boost" => Ok(TransactionType::ListingBoost),
            "subscription" => Ok(TransactionType::Subscription),
            other => Err(TransactionError::UnknownType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_type() {
        for t in TransactionType::ALL {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            "Contact_Reveal".parse::<TransactionType>().unwrap(),
            TransactionType::ContactReveal
        );
    }

    #[test]
    fn rejects_unknown_types() {
        let err = "donation".parse::<TransactionType>().unwrap_err();
        assert_eq!(err, TransactionError::UnknownType("donation".to_string()));
    }

    #[test]
    fn only_reveal_and_subscription_grant_access() {
        assert_eq!(
            TransactionType::ContactReveal.access_type(),
            Some(AccessType::ContactReveal)
        );
        assert_eq!(
            TransactionType::Subscription.access_type(),
            Some(AccessType::Subscription)
        );
        assert_eq!(TransactionType::ListingBoost.access_type(), None);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&TransactionType::ListingBoost).unwrap();
        assert_eq!(json, "\"listing_boost\"");
    }
}
