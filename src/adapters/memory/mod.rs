//! In-memory adapters.
//!
//! Used by tests and by local runs without a database. Each store mirrors
//! the uniqueness and conditional-update rules of its Postgres counterpart.

mod directory;
mod grants;
mod messages;
mod transactions;
mod webhook_events;

pub use directory::{InMemoryListingDirectory, InMemoryUserDirectory};
pub use grants::InMemoryAccessGrantRepository;
pub use messages::InMemoryMessageRepository;
pub use transactions::InMemoryTransactionRepository;
pub use webhook_events::InMemoryWebhookEventRepository;
