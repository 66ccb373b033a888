//! SendMessageHandler and ListMessagesHandler - listing conversations behind the gate.

use std::sync::Arc;

use crate::domain::foundation::{ListingId, UserId};
use crate::domain::messaging::{Message, MessagingError, NewMessage};
use crate::ports::MessageRepository;

use super::MessagingGate;

#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub sender_id: UserId,
    pub listing_id: ListingId,
    /// Required when the owner replies; buyers always write to the owner.
    pub recipient_id: Option<UserId>,
    pub body: String,
}

pub struct SendMessageHandler {
    gate: Arc<MessagingGate>,
    messages: Arc<dyn MessageRepository>,
}

impl SendMessageHandler {
    pub fn new(gate: Arc<MessagingGate>, messages: Arc<dyn MessageRepository>) -> Self {
        Self { gate, messages }
    }

    /// Persists the message only after the gate has passed.
    pub async fn handle(&self, cmd: SendMessageCommand) -> Result<Message, MessagingError> {
        let listing = self.gate.listing(cmd.listing_id).await?;

        let recipient_id = if listing.is_owned_by(cmd.sender_id) {
            cmd.recipient_id.ok_or(MessagingError::InvalidRecipient)?
        } else {
            match cmd.recipient_id {
                Some(recipient) if recipient != listing.owner_id => {
                    return Err(MessagingError::InvalidRecipient);
                }
                _ => listing.owner_id,
            }
        };

        if !self.gate.can_message_on(cmd.sender_id, &listing).await? {
            tracing::info!(
                sender_id = %cmd.sender_id,
                listing_id = %cmd.listing_id,
                "message blocked, no contact access"
            );
            return Err(MessagingError::AccessRequired {
                listing_id: cmd.listing_id,
            });
        }

        let message = NewMessage::new(cmd.listing_id, cmd.sender_id, recipient_id, cmd.body)?;
        let stored = self.messages.insert(message).await?;

        tracing::info!(
            message_id = %stored.id,
            listing_id = %stored.listing_id,
            sender_id = %stored.sender_id,
            recipient_id = %stored.recipient_id,
            "message sent"
        );

        Ok(stored)
    }
}

pub struct ListMessagesHandler {
    messages: Arc<dyn MessageRepository>,
}

impl ListMessagesHandler {
    pub fn new(messages: Arc<dyn MessageRepository>) -> Self {
        Self { messages }
    }

    /// The viewer's side of the conversation on a listing, oldest first.
    pub async fn handle(
        &self,
        listing_id: ListingId,
        viewer_id: UserId,
    ) -> Result<Vec<Message>, MessagingError> {
        Ok(self
            .messages
            .list_for_participant(listing_id, viewer_id)
            .await?)
    }
}
