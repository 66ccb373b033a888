//! Access grants: a buyer's right to see one listing's contact details.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::AccessError;
use crate::domain::foundation::{
    GrantId, ListingId, Timestamp, TransactionId, UserId, ValidationError,
};
use crate::domain::listing::GrantedVia;

/// How the grant was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    #[default]
    ContactReveal,
    Subscription,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::ContactReveal => "contact_reveal",
            AccessType::Subscription => "subscription",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contact_reveal" => Ok(AccessType::ContactReveal),
            "subscription" => Ok(AccessType::Subscription),
            other => Err(ValidationError::invalid_format(
                "access_type",
                format!("unknown access type '{}'", other),
            )),
        }
    }
}

/// A stored access grant. Unique per (buyer, listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: GrantId,
    pub buyer_id: UserId,
    pub listing_id: ListingId,
    pub transaction_id: Option<TransactionId>,
    pub access_type: AccessType,
    pub granted_at: Timestamp,
    /// `None` means lifetime access.
    pub expires_at: Option<Timestamp>,
}

impl AccessGrant {
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(true, |expiry| expiry.is_after(&now))
    }

    /// Paid grants link a transaction; admin grants do not.
    pub fn granted_via(&self) -> GrantedVia {
        if self.transaction_id.is_some() {
            GrantedVia::Payment
        } else {
            GrantedVia::Manual
        }
    }
}

/// Optional parts of a grant request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantOptions {
    pub transaction_id: Option<TransactionId>,
    pub access_type: AccessType,
    pub expires_at: Option<Timestamp>,
}

impl GrantOptions {
    pub fn paid_by(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn with_access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }

    pub fn expiring_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Validated input for inserting a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccessGrant {
    pub buyer_id: UserId,
    pub listing_id: ListingId,
    pub transaction_id: Option<TransactionId>,
    pub access_type: AccessType,
    pub granted_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl NewAccessGrant {
    pub fn new(
        buyer_id: UserId,
        listing_id: ListingId,
        options: GrantOptions,
        granted_at: Timestamp,
    ) -> Result<Self, AccessError> {
        if let Some(expiry) = options.expires_at {
            if !expiry.is_after(&granted_at) {
                return Err(AccessError::InvalidExpiry);
            }
        }

        Ok(Self {
            buyer_id,
            listing_id,
            transaction_id: options.transaction_id,
            access_type: options.access_type,
            granted_at,
            expires_at: options.expires_at,
        })
    }

    pub fn into_grant(self, id: GrantId) -> AccessGrant {
        AccessGrant {
            id,
            buyer_id: self.buyer_id,
            listing_id: self.listing_id,
            transaction_id: self.transaction_id,
            access_type: self.access_type,
            granted_at: self.granted_at,
            expires_at: self.expires_at,
        }
    }
}

/// Result of an insert-or-ignore on the (buyer, listing) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Created(GrantId),
    Existing(GrantId),
}

impl GrantOutcome {
    pub fn id(&self) -> GrantId {
        match self {
            GrantOutcome::Created(id) | GrantOutcome::Existing(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, GrantOutcome::Created(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_grant_is_always_active() {
        let now = Timestamp::now();
        let grant = NewAccessGrant::new(UserId::new(42), ListingId::new(7), GrantOptions::default(), now)
            .unwrap()
            .into_grant(GrantId::new(1));

        assert!(grant.is_active(now.add_days(10_000)));
    }

    #[test]
    fn expired_grant_is_inactive() {
        let now = Timestamp::now();
        let grant = NewAccessGrant::new(
            UserId::new(42),
            ListingId::new(7),
            GrantOptions::default().expiring_at(now.add_days(30)),
            now,
        )
        .unwrap()
        .into_grant(GrantId::new(1));

        assert!(grant.is_active(now.add_days(29)));
        assert!(!grant.is_active(now.add_days(30)));
    }

    #[test]
    fn expiry_must_follow_grant_time() {
        let now = Timestamp::now();
        let result = NewAccessGrant::new(
            UserId::new(42),
            ListingId::new(7),
            GrantOptions::default().expiring_at(now),
            now,
        );
        assert_eq!(result, Err(AccessError::InvalidExpiry));
    }

    #[test]
    fn granted_via_depends_on_transaction_link() {
        let now = Timestamp::now();
        let paid = NewAccessGrant::new(
            UserId::new(42),
            ListingId::new(7),
            GrantOptions::default().paid_by(TransactionId::new(101)),
            now,
        )
        .unwrap()
        .into_grant(GrantId::new(1));
        let manual = NewAccessGrant::new(UserId::new(43), ListingId::new(7), GrantOptions::default(), now)
            .unwrap()
            .into_grant(GrantId::new(2));

        assert_eq!(paid.granted_via(), GrantedVia::Payment);
        assert_eq!(manual.granted_via(), GrantedVia::Manual);
    }

    #[test]
    fn outcome_exposes_id_either_way() {
        assert_eq!(GrantOutcome::Created(GrantId::new(5)).id(), GrantId::new(5));
        assert_eq!(GrantOutcome::Existing(GrantId::new(5)).id(), GrantId::new(5));
        assert!(!GrantOutcome::Existing(GrantId::new(5)).is_new());
    }

    #[test]
    fn access_type_parses_known_values() {
        assert_eq!("subscription".parse::<AccessType>().unwrap(), AccessType::Subscription);
        assert!("lifetime".parse::<AccessType>().is_err());
    }
}
