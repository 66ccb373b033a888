//! LedgerEventPublisher port - outbound notifications about ledger changes.
//!
//! This port lets the application announce grants, refunds and boosts
//! without knowing the transport.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::ledger::LedgerEventEnvelope;

/// Port for publishing ledger events.
///
/// Callers treat delivery as best-effort: a failed publish is logged and the
/// ledger write it describes stands.
#[async_trait]
pub trait LedgerEventPublisher: Send + Sync {
    async fn publish(&self, event: LedgerEventEnvelope) -> Result<(), DomainError>;
}
