//! In-memory ledger event publisher.
//!
//! Captures published events for assertions in tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::domain::ledger::{LedgerEvent, LedgerEventEnvelope};
use crate::ports::LedgerEventPublisher;

/// Publisher that records every event it is given.
///
/// # Example
///
/// ```ignore
/// let publisher = Arc::new(InMemoryEventPublisher::new());
/// reconciler.handle(payload, Some(&header)).await?;
/// assert!(publisher.has_event("access.granted").await);
/// ```
#[derive(Default)]
pub struct InMemoryEventPublisher {
    published: RwLock<Vec<LedgerEventEnvelope>>,
    failing: AtomicBool,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every publish fail, to check that callers shrug it off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    // === Test Helpers ===

    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.published
            .read()
            .await
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    pub async fn events_of_type(&self, event_type: &str) -> Vec<LedgerEvent> {
        self.published
            .read()
            .await
            .iter()
            .filter(|e| e.event_type() == event_type)
            .map(|e| e.event.clone())
            .collect()
    }

    pub async fn has_event(&self, event_type: &str) -> bool {
        !self.events_of_type(event_type).await.is_empty()
    }

    pub async fn event_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait]
impl LedgerEventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: LedgerEventEnvelope) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::database("event transport unavailable"));
        }
        self.published.write().await.push(event);
        Ok(())
    }
}
