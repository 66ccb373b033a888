//! In-memory message repository.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ListingId, MessageId, Timestamp, UserId};
use crate::domain::messaging::{Message, NewMessage};
use crate::ports::MessageRepository;

pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
    next_id: AtomicI64,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<Message, DomainError> {
        let id = MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let stored = message.into_message(id, Timestamp::now());
        self.messages.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_participant(
        &self,
        listing_id: ListingId,
        participant: UserId,
    ) -> Result<Vec<Message>, DomainError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                m.listing_id == listing_id
                    && (m.sender_id == participant || m.recipient_id == participant)
            })
            .cloned()
            .collect())
    }
}
