//! Directory ports - read access to marketplace listings and users.
//!
//! Listings and users are owned by the marketplace; the ledger only reads them
//! and toggles a listing's featured window.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ListingId, Timestamp, UserId};
use crate::domain::listing::{ListingRef, UserRef};

#[async_trait]
pub trait ListingDirectory: Send + Sync {
    async fn find_listing(&self, id: ListingId) -> Result<Option<ListingRef>, DomainError>;

    /// Sets `featured_until` to the later of its current value and `until`.
    ///
    /// Returns `false` if the listing does not exist.
    async fn extend_featured_until(
        &self,
        id: ListingId,
        until: Timestamp,
    ) -> Result<bool, DomainError>;

    async fn clear_featured(&self, id: ListingId) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<UserRef>, DomainError>;
}
