//! ContactRevealHandler - returns a listing's contact details once access is proven.

use std::sync::Arc;

use crate::config::Pricing;
use crate::domain::access::AccessError;
use crate::domain::foundation::{ListingId, UserId};
use crate::domain::ledger::TransactionType;
use crate::domain::listing::{ContactReveal, GrantedVia, RevealedContact};
use crate::ports::ListingDirectory;

use super::AccessGrantManager;

/// Query for a listing's contact details.
#[derive(Debug, Clone, Copy)]
pub struct GetContactQuery {
    pub listing_id: ListingId,
    pub viewer_id: UserId,
}

pub struct ContactRevealHandler {
    listings: Arc<dyn ListingDirectory>,
    access: Arc<AccessGrantManager>,
    pricing: Pricing,
}

impl ContactRevealHandler {
    pub fn new(
        listings: Arc<dyn ListingDirectory>,
        access: Arc<AccessGrantManager>,
        pricing: Pricing,
    ) -> Self {
        Self {
            listings,
            access,
            pricing,
        }
    }

    /// Contact details with how access was obtained, or the price to unlock them.
    pub async fn handle(&self, query: GetContactQuery) -> Result<ContactReveal, AccessError> {
        let listing = self
            .listings
            .find_listing(query.listing_id)
            .await?
            .ok_or(AccessError::InvalidListing(query.listing_id))?;

        let granted_via = if listing.is_owned_by(query.viewer_id) {
            Some(GrantedVia::Owner)
        } else if let Some(grant) = self
            .access
            .active_grant(query.viewer_id, query.listing_id)
            .await?
        {
            Some(grant.granted_via())
        } else if self.access.is_admin(query.viewer_id).await? {
            Some(GrantedVia::Manual)
        } else {
            None
        };

        Ok(match granted_via {
            Some(via) => {
                tracing::debug!(
                    listing_id = %query.listing_id,
                    viewer_id = %query.viewer_id,
                    granted_via = ?via,
                    "contact details revealed"
                );
                ContactReveal::Revealed(RevealedContact::new(listing.contact, via))
            }
            None => ContactReveal::PaymentRequired {
                price: self.pricing.price_for(TransactionType::ContactReveal),
                currency: self.pricing.currency.clone(),
            },
        })
    }
}
