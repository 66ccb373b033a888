//! Ledger event publisher that writes events to the log.
//!
//! The default transport: downstream notification workers tail structured
//! logs under the `ledger_events` target.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::ledger::LedgerEventEnvelope;
use crate::ports::LedgerEventPublisher;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LedgerEventPublisher for TracingEventPublisher {
    async fn publish(&self, event: LedgerEventEnvelope) -> Result<(), DomainError> {
        let payload = serde_json::to_string(&event.event).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to serialize ledger event: {}", e),
            )
        })?;

        tracing::info!(
            target: "ledger_events",
            event_id = %event.event_id,
            event_type = event.event_type(),
            occurred_at = %event.occurred_at.as_datetime(),
            payload = %payload,
            "ledger event"
        );
        Ok(())
    }
}
