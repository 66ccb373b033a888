//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Ledger Ports
//!
//! - `TransactionRepository` - Transactions and revenue reporting
//! - `AccessGrantRepository` - Contact access grants
//! - `MessageRepository` - Buyer/seller messages
//!
//! ## Marketplace Ports
//!
//! - `ListingDirectory` / `UserDirectory` - Read access to listings and users
//!
//! ## Payment Ports
//!
//! - `PaymentProvider` - Hosted checkout sessions
//! - `WebhookEventRepository` - Processed webhook journal
//!
//! ## Event Ports
//!
//! - `LedgerEventPublisher` - Best-effort ledger notifications

mod access_grant_repository;
mod directory;
mod event_publisher;
mod message_repository;
mod payment_provider;
mod transaction_repository;
mod webhook_event_repository;

pub use access_grant_repository::AccessGrantRepository;
pub use directory::{ListingDirectory, UserDirectory};
pub use event_publisher::LedgerEventPublisher;
pub use message_repository::MessageRepository;
pub use payment_provider::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode, PaymentProvider,
};
pub use transaction_repository::TransactionRepository;
pub use webhook_event_repository::{
    ProcessingResult, SaveResult, WebhookEventRecord, WebhookEventRepository,
};
