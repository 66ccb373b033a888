//! MessageRepository port - persistence for listing messages.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ListingId, UserId};
use crate::domain::messaging::{Message, NewMessage};

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: NewMessage) -> Result<Message, DomainError>;

    /// Messages on the listing sent or received by `participant`, oldest first.
    async fn list_for_participant(
        &self,
        listing_id: ListingId,
        participant: UserId,
    ) -> Result<Vec<Message>, DomainError>;
}
