//! Messages exchanged about a listing.

use serde::{Deserialize, Serialize};

use super::MessagingError;
use crate::domain::foundation::{ListingId, MessageId, Timestamp, UserId};

pub const MAX_BODY_CHARS: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub listing_id: ListingId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
    pub sent_at: Timestamp,
}

/// Validated message awaiting persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub listing_id: ListingId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
}

impl NewMessage {
    pub fn new(
        listing_id: ListingId,
        sender_id: UserId,
        recipient_id: UserId,
        body: impl Into<String>,
    ) -> Result<Self, MessagingError> {
        let body = body.into().trim().to_string();
        if body.is_empty() {
            return Err(MessagingError::EmptyBody);
        }
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(MessagingError::BodyTooLong {
                max: MAX_BODY_CHARS,
            });
        }
        if sender_id == recipient_id {
            return Err(MessagingError::InvalidRecipient);
        }

        Ok(Self {
            listing_id,
            sender_id,
            recipient_id,
            body,
        })
    }

    pub fn into_message(self, id: MessageId, sent_at: Timestamp) -> Message {
        Message {
            id,
            listing_id: self.listing_id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            body: self.body,
            sent_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_trimmed() {
        let msg = NewMessage::new(ListingId::new(7), UserId::new(42), UserId::new(1), "  hi  ").unwrap();
        assert_eq!(msg.body, "hi");
    }

    #[test]
    fn blank_body_is_rejected() {
        let result = NewMessage::new(ListingId::new(7), UserId::new(42), UserId::new(1), "   ");
        assert_eq!(result, Err(MessagingError::EmptyBody));
    }

    #[test]
    fn oversized_body_is_rejected() {
        let body = "x".repeat(MAX_BODY_CHARS + 1);
        let result = NewMessage::new(ListingId::new(7), UserId::new(42), UserId::new(1), body);
        assert_eq!(result, Err(MessagingError::BodyTooLong { max: MAX_BODY_CHARS }));
    }

    #[test]
    fn messaging_yourself_is_rejected() {
        let result = NewMessage::new(ListingId::new(7), UserId::new(42), UserId::new(42), "hi");
        assert_eq!(result, Err(MessagingError::InvalidRecipient));
    }
}
