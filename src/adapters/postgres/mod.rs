//! PostgreSQL adapters - sqlx implementations of the storage ports.
//!
//! - `PostgresTransactionRepository` - transactions and revenue aggregation
//! - `PostgresAccessGrantRepository` - insert-or-ignore access grants
//! - `PostgresMessageRepository` - listing messages
//! - `PostgresWebhookEventRepository` - processed webhook journal
//! - `PostgresListingDirectory` / `PostgresUserDirectory` - marketplace lookups

mod access_grant_repository;
mod directory;
mod message_repository;
mod transaction_repository;
mod webhook_event_repository;

pub use access_grant_repository::PostgresAccessGrantRepository;
pub use directory::{PostgresListingDirectory, PostgresUserDirectory};
pub use message_repository::PostgresMessageRepository;
pub use transaction_repository::PostgresTransactionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}
