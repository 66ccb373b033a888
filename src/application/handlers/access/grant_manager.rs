//! AccessGrantManager - decides and records who may see a listing's contact details.

use std::sync::Arc;

use crate::application::EventNotifier;
use crate::domain::access::{AccessError, AccessGrant, GrantOptions, GrantOutcome, NewAccessGrant};
use crate::domain::foundation::{GrantId, ListingId, Timestamp, UserId};
use crate::domain::ledger::LedgerEvent;
use crate::ports::{AccessGrantRepository, LedgerEventPublisher, ListingDirectory, UserDirectory};

/// Grants, checks and revokes contact access.
///
/// Owners and admins always have access and are never stored as grants.
/// Everyone else needs a non-expired row for the (buyer, listing) pair.
pub struct AccessGrantManager {
    grants: Arc<dyn AccessGrantRepository>,
    listings: Arc<dyn ListingDirectory>,
    users: Arc<dyn UserDirectory>,
    notifier: EventNotifier,
}

impl AccessGrantManager {
    pub fn new(
        grants: Arc<dyn AccessGrantRepository>,
        listings: Arc<dyn ListingDirectory>,
        users: Arc<dyn UserDirectory>,
        publisher: Arc<dyn LedgerEventPublisher>,
    ) -> Self {
        Self {
            grants,
            listings,
            users,
            notifier: EventNotifier::new(publisher),
        }
    }

    /// Grants `buyer` access to `listing`.
    ///
    /// A second grant for the same pair returns the existing id. An expired
    /// grant still on file is replaced so that renewals take effect before
    /// the sweeper runs.
    pub async fn grant_access(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
        options: GrantOptions,
    ) -> Result<GrantOutcome, AccessError> {
        if self.users.find_user(buyer_id).await?.is_none() {
            return Err(AccessError::InvalidBuyer(buyer_id));
        }

        let listing = self
            .listings
            .find_listing(listing_id)
            .await?
            .ok_or(AccessError::InvalidListing(listing_id))?;

        if listing.is_owned_by(buyer_id) {
            return Err(AccessError::SelfGrantDenied);
        }

        let now = Timestamp::now();
        let grant = NewAccessGrant::new(buyer_id, listing_id, options, now)?;

        let mut outcome = self.grants.insert_if_absent(grant.clone()).await?;

        if let GrantOutcome::Existing(_) = outcome {
            let stale = self
                .grants
                .find(buyer_id, listing_id)
                .await?
                .is_some_and(|existing| !existing.is_active(now));

            if stale {
                tracing::debug!(%buyer_id, %listing_id, "replacing expired access grant");
                self.grants.delete(buyer_id, listing_id).await?;
                outcome = self.grants.insert_if_absent(grant.clone()).await?;
            }
        }

        if let GrantOutcome::Created(grant_id) = outcome {
            tracing::info!(
                %grant_id,
                %buyer_id,
                %listing_id,
                access_type = %grant.access_type,
                transaction_id = ?grant.transaction_id,
                "access granted"
            );
            self.notifier
                .notify(LedgerEvent::AccessGranted {
                    grant_id,
                    buyer_id,
                    listing_id,
                    transaction_id: grant.transaction_id,
                })
                .await;
        }

        Ok(outcome)
    }

    /// True for the owner, admins, and holders of a non-expired grant.
    ///
    /// An unknown listing has no contact details to see, so nobody has access.
    pub async fn check_access(
        &self,
        user_id: UserId,
        listing_id: ListingId,
    ) -> Result<bool, AccessError> {
        let Some(listing) = self.listings.find_listing(listing_id).await? else {
            return Ok(false);
        };

        if listing.is_owned_by(user_id) || self.is_admin(user_id).await? {
            return Ok(true);
        }

        self.has_active_grant(user_id, listing_id).await
    }

    /// True if a stored, non-expired grant exists. Ignores ownership and admin rights.
    pub async fn has_active_grant(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<bool, AccessError> {
        Ok(self.active_grant(buyer_id, listing_id).await?.is_some())
    }

    /// The stored grant for the pair, if it has not expired.
    pub async fn active_grant(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<AccessGrant>, AccessError> {
        let now = Timestamp::now();
        Ok(self
            .grants
            .find(buyer_id, listing_id)
            .await?
            .filter(|grant| grant.is_active(now)))
    }

    /// The stored grant for the pair, expired or not.
    pub async fn find_grant(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<AccessGrant>, AccessError> {
        Ok(self.grants.find(buyer_id, listing_id).await?)
    }

    pub async fn is_admin(&self, user_id: UserId) -> Result<bool, AccessError> {
        Ok(self
            .users
            .find_user(user_id)
            .await?
            .is_some_and(|user| user.is_admin))
    }

    /// Deletes the pair's grant. Returns false if there was none.
    pub async fn revoke_access(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<bool, AccessError> {
        let removed = self.grants.delete(buyer_id, listing_id).await?;

        if removed {
            tracing::info!(%buyer_id, %listing_id, "access revoked");
            self.notifier
                .notify(LedgerEvent::AccessRevoked {
                    buyer_id,
                    listing_id,
                })
                .await;
        }

        Ok(removed)
    }

    pub async fn revoke_by_grant_id(&self, grant_id: GrantId) -> Result<bool, AccessError> {
        let Some(grant) = self.grants.find_by_id(grant_id).await? else {
            return Ok(false);
        };

        let removed = self.grants.delete_by_id(grant_id).await?;

        if removed {
            tracing::info!(
                %grant_id,
                buyer_id = %grant.buyer_id,
                listing_id = %grant.listing_id,
                "access revoked by grant id"
            );
            self.notifier
                .notify(LedgerEvent::AccessRevoked {
                    buyer_id: grant.buyer_id,
                    listing_id: grant.listing_id,
                })
                .await;
        }

        Ok(removed)
    }

    pub async fn list_by_listing(
        &self,
        listing_id: ListingId,
    ) -> Result<Vec<AccessGrant>, AccessError> {
        Ok(self.grants.list_by_listing(listing_id).await?)
    }

    /// Active grants held by `buyer_id`.
    pub async fn list_by_buyer(&self, buyer_id: UserId) -> Result<Vec<AccessGrant>, AccessError> {
        Ok(self
            .grants
            .list_active_by_buyer(buyer_id, Timestamp::now())
            .await?)
    }

    pub async fn count_by_listing(&self, listing_id: ListingId) -> Result<u64, AccessError> {
        Ok(self.grants.count_by_listing(listing_id).await?)
    }

    /// Deletes every grant whose expiry has passed.
    pub async fn sweep_expired(&self) -> Result<u64, AccessError> {
        let removed = self.grants.delete_expired(Timestamp::now()).await?;
        if removed > 0 {
            tracing::info!(removed, "expired access grants swept");
        }
        Ok(removed)
    }
}
