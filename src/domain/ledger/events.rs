//! Notifications emitted after ledger state changes.
//!
//! Delivery is best-effort: the ledger write is the source of truth and a lost
//! notification never rolls it back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Currency;
use crate::domain::foundation::{GrantId, ListingId, Timestamp, TransactionId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    AccessGranted {
        grant_id: GrantId,
        buyer_id: UserId,
        listing_id: ListingId,
        transaction_id: Option<TransactionId>,
    },
    AccessRevoked {
        buyer_id: UserId,
        listing_id: ListingId,
    },
    TransactionCompleted {
        transaction_id: TransactionId,
        buyer_id: UserId,
        listing_id: Option<ListingId>,
        amount: Decimal,
        currency: Currency,
    },
    TransactionRefunded {
        transaction_id: TransactionId,
        buyer_id: UserId,
        listing_id: Option<ListingId>,
    },
    ListingFeatured {
        listing_id: ListingId,
        featured_until: Timestamp,
    },
}

impl LedgerEvent {
    /// Dotted routing key, e.g. `access.granted`.
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::AccessGranted { .. } => "access.granted",
            LedgerEvent::AccessRevoked { .. } => "access.revoked",
            LedgerEvent::TransactionCompleted { .. } => "transaction.completed",
            LedgerEvent::TransactionRefunded { .. } => "transaction.refunded",
            LedgerEvent::ListingFeatured { .. } => "listing.featured",
        }
    }
}

/// Event plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: Timestamp,
    pub event: LedgerEvent,
}

impl LedgerEventEnvelope {
    pub fn new(event: LedgerEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Timestamp::now(),
            event,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = LedgerEvent::AccessRevoked {
            buyer_id: UserId::new(42),
            listing_id: ListingId::new(7),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "access_revoked");
        assert_eq!(json["buyer_id"], 42);
        assert_eq!(json["listing_id"], 7);
    }

    #[test]
    fn envelopes_get_distinct_ids() {
        let event = LedgerEvent::ListingFeatured {
            listing_id: ListingId::new(7),
            featured_until: Timestamp::now(),
        };
        let a = LedgerEventEnvelope::new(event.clone());
        let b = LedgerEventEnvelope::new(event);
        assert_ne!(a.event_id, b.event_id);
        assert_eq!(a.event_type(), "listing.featured");
    }
}
