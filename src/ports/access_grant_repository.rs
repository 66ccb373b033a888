//! AccessGrantRepository port - persistence for contact access grants.

use async_trait::async_trait;

use crate::domain::access::{AccessGrant, GrantOutcome, NewAccessGrant};
use crate::domain::foundation::{DomainError, GrantId, ListingId, Timestamp, UserId};

/// Port for storing access grants.
///
/// Implementations must enforce uniqueness on (buyer, listing) in storage so
/// concurrent inserts for the same pair converge on one row.
#[async_trait]
pub trait AccessGrantRepository: Send + Sync {
    /// Insert-or-ignore on the (buyer, listing) pair.
    async fn insert_if_absent(&self, grant: NewAccessGrant) -> Result<GrantOutcome, DomainError>;

    async fn find(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<AccessGrant>, DomainError>;

    async fn find_by_id(&self, id: GrantId) -> Result<Option<AccessGrant>, DomainError>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, buyer_id: UserId, listing_id: ListingId) -> Result<bool, DomainError>;

    async fn delete_by_id(&self, id: GrantId) -> Result<bool, DomainError>;

    /// Every grant for the listing, newest first.
    async fn list_by_listing(&self, listing_id: ListingId) -> Result<Vec<AccessGrant>, DomainError>;

    /// Grants for the buyer that have not expired at `now`, newest first.
    async fn list_active_by_buyer(
        &self,
        buyer_id: UserId,
        now: Timestamp,
    ) -> Result<Vec<AccessGrant>, DomainError>;

    async fn count_by_listing(&self, listing_id: ListingId) -> Result<u64, DomainError>;

    /// Deletes grants whose expiry is at or before `now`.
    async fn delete_expired(&self, now: Timestamp) -> Result<u64, DomainError>;
}
