//! Fire-and-forget delivery of ledger events.

use std::sync::Arc;

use crate::domain::ledger::{LedgerEvent, LedgerEventEnvelope};
use crate::ports::LedgerEventPublisher;

/// Wraps a publisher so that delivery failures are logged and swallowed.
///
/// Ledger writes are the source of truth; a notification that fails to go
/// out never turns a successful request into an error.
#[derive(Clone)]
pub struct EventNotifier {
    publisher: Arc<dyn LedgerEventPublisher>,
}

impl EventNotifier {
    pub fn new(publisher: Arc<dyn LedgerEventPublisher>) -> Self {
        Self { publisher }
    }

    pub async fn notify(&self, event: LedgerEvent) {
        let envelope = LedgerEventEnvelope::new(event);
        let event_type = envelope.event_type();
        let event_id = envelope.event_id;

        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(
                event_type,
                %event_id,
                error = %e,
                "failed to publish ledger event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventPublisher;
    use crate::domain::foundation::{ListingId, UserId};

    fn revoked() -> LedgerEvent {
        LedgerEvent::AccessRevoked {
            buyer_id: UserId::new(42),
            listing_id: ListingId::new(7),
        }
    }

    #[tokio::test]
    async fn notify_publishes_envelope() {
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let notifier = EventNotifier::new(publisher.clone());

        notifier.notify(revoked()).await;

        assert!(publisher.has_event("access.revoked").await);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let publisher = Arc::new(InMemoryEventPublisher::new());
        publisher.set_failing(true);
        let notifier = EventNotifier::new(publisher.clone());

        notifier.notify(revoked()).await;

        assert_eq!(publisher.event_count().await, 0);
    }
}
