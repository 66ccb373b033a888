//! Read-only views of marketplace listings and users.
//!
//! Both live in tables this service does not own; only the fields the ledger
//! needs are carried.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ListingId, Timestamp, UserId};

/// Contact fields. Never leave the service unless access is proven.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRef {
    pub id: ListingId,
    pub owner_id: UserId,
    pub contact: ContactDetails,
    pub featured_until: Option<Timestamp>,
}

impl ListingRef {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn is_featured(&self, now: Timestamp) -> bool {
        self.featured_until.map_or(false, |until| until.is_after(&now))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    pub is_admin: bool,
}
