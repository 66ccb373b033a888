//! PostgreSQL implementation of MessageRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ListingId, MessageId, Timestamp, UserId};
use crate::domain::messaging::{Message, NewMessage};
use crate::ports::MessageRepository;

use super::db_error;

pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    listing_id: i64,
    sender_id: i64,
    recipient_id: i64,
    body: String,
    sent_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: MessageId::new(row.id),
            listing_id: ListingId::new(row.listing_id),
            sender_id: UserId::new(row.sender_id),
            recipient_id: UserId::new(row.recipient_id),
            body: row.body,
            sent_at: Timestamp::from_datetime(row.sent_at),
        }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<Message, DomainError> {
        let sent_at = Timestamp::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO messages (listing_id, sender_id, recipient_id, body, sent_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(message.listing_id.value())
        .bind(message.sender_id.value())
        .bind(message.recipient_id.value())
        .bind(&message.body)
        .bind(sent_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("insert message", e))?;

        Ok(message.into_message(MessageId::new(id), sent_at))
    }

    async fn list_for_participant(
        &self,
        listing_id: ListingId,
        participant: UserId,
    ) -> Result<Vec<Message>, DomainError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, listing_id, sender_id, recipient_id, body, sent_at
            FROM messages
            WHERE listing_id = $1 AND (sender_id = $2 OR recipient_id = $2)
            ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(listing_id.value())
        .bind(participant.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list messages", e))?;

        Ok(rows.into_iter().map(Message::from).collect())
    }
}
