//! In-memory listing and user directories.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ListingId, Timestamp, UserId};
use crate::domain::listing::{ContactDetails, ListingRef, UserRef};
use crate::ports::{ListingDirectory, UserDirectory};

#[derive(Default)]
pub struct InMemoryListingDirectory {
    listings: RwLock<HashMap<ListingId, ListingRef>>,
}

impl InMemoryListingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, listing: ListingRef) {
        self.listings.write().await.insert(listing.id, listing);
    }

    /// Adds a listing with sample contact details.
    pub async fn add_listing(&self, id: ListingId, owner_id: UserId) {
        self.add(ListingRef {
            id,
            owner_id,
            contact: ContactDetails {
                email: Some(format!("seller{}@example.com", owner_id)),
                phone: Some("+1 555 0100".to_string()),
            },
            featured_until: None,
        })
        .await;
    }

    pub async fn featured_until(&self, id: ListingId) -> Option<Timestamp> {
        self.listings
            .read()
            .await
            .get(&id)
            .and_then(|l| l.featured_until)
    }
}

#[async_trait]
impl ListingDirectory for InMemoryListingDirectory {
    async fn find_listing(&self, id: ListingId) -> Result<Option<ListingRef>, DomainError> {
        Ok(self.listings.read().await.get(&id).cloned())
    }

    async fn extend_featured_until(
        &self,
        id: ListingId,
        until: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut listings = self.listings.write().await;
        match listings.get_mut(&id) {
            Some(listing) => {
                let extended = listing
                    .featured_until
                    .map_or(until, |current| current.max(until));
                listing.featured_until = Some(extended);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_featured(&self, id: ListingId) -> Result<bool, DomainError> {
        let mut listings = self.listings.write().await;
        match listings.get_mut(&id) {
            Some(listing) => {
                listing.featured_until = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserRef>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, id: UserId) {
        self.users
            .write()
            .await
            .insert(id, UserRef { id, is_admin: false });
    }

    pub async fn add_admin(&self, id: UserId) {
        self.users
            .write()
            .await
            .insert(id, UserRef { id, is_admin: true });
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<UserRef>, DomainError> {
        Ok(self.users.read().await.get(&id).copied())
    }
}
