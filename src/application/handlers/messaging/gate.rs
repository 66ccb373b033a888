//! MessagingGate - decides whether a user may message about a listing.

use std::sync::Arc;

use crate::application::handlers::access::AccessGrantManager;
use crate::domain::access::AccessError;
use crate::domain::foundation::{ListingId, UserId};
use crate::domain::listing::ListingRef;
use crate::domain::messaging::MessagingError;
use crate::ports::ListingDirectory;

pub struct MessagingGate {
    listings: Arc<dyn ListingDirectory>,
    access: Arc<AccessGrantManager>,
}

impl MessagingGate {
    pub fn new(listings: Arc<dyn ListingDirectory>, access: Arc<AccessGrantManager>) -> Self {
        Self { listings, access }
    }

    /// Owners always may; everyone else needs contact access.
    pub async fn can_message(
        &self,
        sender_id: UserId,
        listing_id: ListingId,
    ) -> Result<bool, MessagingError> {
        let listing = self.listing(listing_id).await?;
        self.can_message_on(sender_id, &listing).await
    }

    pub(super) async fn listing(&self, listing_id: ListingId) -> Result<ListingRef, MessagingError> {
        self.listings
            .find_listing(listing_id)
            .await?
            .ok_or(MessagingError::ListingNotFound(listing_id))
    }

    pub(super) async fn can_message_on(
        &self,
        sender_id: UserId,
        listing: &ListingRef,
    ) -> Result<bool, MessagingError> {
        if listing.is_owned_by(sender_id) {
            return Ok(true);
        }

        self.access
            .check_access(sender_id, listing.id)
            .await
            .map_err(|e| match e {
                AccessError::InvalidListing(id) => MessagingError::ListingNotFound(id),
                other => MessagingError::Storage(other.to_string()),
            })
    }
}
