//! In-memory access grant repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::domain::access::{AccessGrant, GrantOutcome, NewAccessGrant};
use crate::domain::foundation::{DomainError, GrantId, ListingId, Timestamp, UserId};
use crate::ports::AccessGrantRepository;

/// Grants keyed by (buyer, listing), mirroring the unique index in Postgres.
pub struct InMemoryAccessGrantRepository {
    grants: RwLock<HashMap<(UserId, ListingId), AccessGrant>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl InMemoryAccessGrantRepository {
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.grants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.grants.read().await.is_empty()
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DomainError::database("simulated storage outage"))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryAccessGrantRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(mut grants: Vec<AccessGrant>) -> Vec<AccessGrant> {
    grants.sort_by(|a, b| (b.granted_at, b.id).cmp(&(a.granted_at, a.id)));
    grants
}

#[async_trait]
impl AccessGrantRepository for InMemoryAccessGrantRepository {
    async fn insert_if_absent(&self, grant: NewAccessGrant) -> Result<GrantOutcome, DomainError> {
        self.check()?;
        let mut grants = self.grants.write().await;
        let key = (grant.buyer_id, grant.listing_id);

        if let Some(existing) = grants.get(&key) {
            return Ok(GrantOutcome::Existing(existing.id));
        }

        let id = GrantId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        grants.insert(key, grant.into_grant(id));
        Ok(GrantOutcome::Created(id))
    }

    async fn find(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<AccessGrant>, DomainError> {
        self.check()?;
        Ok(self.grants.read().await.get(&(buyer_id, listing_id)).cloned())
    }

    async fn find_by_id(&self, id: GrantId) -> Result<Option<AccessGrant>, DomainError> {
        self.check()?;
        Ok(self
            .grants
            .read()
            .await
            .values()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn delete(&self, buyer_id: UserId, listing_id: ListingId) -> Result<bool, DomainError> {
        self.check()?;
        Ok(self
            .grants
            .write()
            .await
            .remove(&(buyer_id, listing_id))
            .is_some())
    }

    async fn delete_by_id(&self, id: GrantId) -> Result<bool, DomainError> {
        self.check()?;
        let mut grants = self.grants.write().await;
        let before = grants.len();
        grants.retain(|_, g| g.id != id);
        Ok(grants.len() < before)
    }

    async fn list_by_listing(&self, listing_id: ListingId) -> Result<Vec<AccessGrant>, DomainError> {
        self.check()?;
        let grants = self.grants.read().await;
        Ok(newest_first(
            grants
                .values()
                .filter(|g| g.listing_id == listing_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_active_by_buyer(
        &self,
        buyer_id: UserId,
        now: Timestamp,
    ) -> Result<Vec<AccessGrant>, DomainError> {
        self.check()?;
        let grants = self.grants.read().await;
        Ok(newest_first(
            grants
                .values()
                .filter(|g| g.buyer_id == buyer_id && g.is_active(now))
                .cloned()
                .collect(),
        ))
    }

    async fn count_by_listing(&self, listing_id: ListingId) -> Result<u64, DomainError> {
        self.check()?;
        Ok(self
            .grants
            .read()
            .await
            .values()
            .filter(|g| g.listing_id == listing_id)
            .count() as u64)
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64, DomainError> {
        self.check()?;
        let mut grants = self.grants.write().await;
        let before = grants.len();
        grants.retain(|_, g| g.is_active(now));
        Ok((before - grants.len()) as u64)
    }
}
