//! Normalized payment event.
//!
//! Provider objects differ per event type (checkout session, payment intent,
//! charge). After verification each one is reduced to a single
//! [`PaymentEvent`] so the reconciler never reads raw JSON.

use serde_json::Value;

use super::provider_event::{ProviderEvent, ProviderEventKind};
use super::WebhookError;
use crate::domain::foundation::{ListingId, TransactionId, UserId};
use crate::domain::ledger::TransactionType;

/// What the event means for the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Refunded,
    /// Recognized event that requires no ledger change.
    Ignored,
}

/// Correlation metadata written at checkout and echoed back by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub transaction_id: Option<TransactionId>,
    pub user_id: Option<UserId>,
    pub listing_id: Option<ListingId>,
    pub payment_type: Option<TransactionType>,
}

impl CheckoutMetadata {
    /// Reads string-valued metadata; unparseable values are dropped.
    pub fn from_value(metadata: Option<&Value>) -> Self {
        let field = |key: &str| {
            metadata
                .and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        Self {
            transaction_id: field("transaction_id").and_then(|v| v.parse().ok()),
            user_id: field("user_id").and_then(|v| v.parse().ok()),
            listing_id: field("listing_id").and_then(|v| v.parse().ok()),
            payment_type: field("payment_type").and_then(|v| v.parse().ok()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub event_id: String,
    pub kind: ProviderEventKind,
    pub outcome: PaymentOutcome,
    pub livemode: bool,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub charge_id: Option<String>,
    pub metadata: CheckoutMetadata,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub failure_reason: Option<String>,
}

impl PaymentEvent {
    /// Normalizes a verified provider event.
    ///
    /// Fails with `MalformedEvent` when a recognized type lacks its object id.
    pub fn from_provider(event: &ProviderEvent) -> Result<Self, WebhookError> {
        let object = &event.data.object;
        let kind = event.kind();

        let mut normalized = Self {
            event_id: event.id.clone(),
            kind,
            outcome: PaymentOutcome::Ignored,
            livemode: event.livemode,
            session_id: None,
            payment_intent_id: None,
            charge_id: None,
            metadata: CheckoutMetadata::from_value(object.get("metadata")),
            amount_minor: None,
            currency: string_field(object, "currency"),
            failure_reason: None,
        };

        if kind == ProviderEventKind::Unknown {
            return Ok(normalized);
        }

        let object_id = string_field(object, "id").ok_or_else(|| {
            WebhookError::MalformedEvent(format!("{} object has no id", kind.as_str()))
        })?;

        match kind {
            ProviderEventKind::CheckoutSessionCompleted => {
                normalized.session_id = Some(object_id);
                normalized.payment_intent_id = reference_field(object, "payment_intent");
                normalized.amount_minor = object.get("amount_total").and_then(Value::as_i64);
                // Delayed payment methods complete the session before money arrives.
                let paid = string_field(object, "payment_status")
                    .map_or(true, |status| status != "unpaid");
                normalized.outcome = if paid {
                    PaymentOutcome::Succeeded
                } else {
                    PaymentOutcome::Ignored
                };
            }
            ProviderEventKind::PaymentIntentSucceeded => {
                normalized.payment_intent_id = Some(object_id);
                normalized.amount_minor = object
                    .get("amount_received")
                    .or_else(|| object.get("amount"))
                    .and_then(Value::as_i64);
                normalized.outcome = PaymentOutcome::Succeeded;
            }
            ProviderEventKind::PaymentIntentFailed => {
                normalized.payment_intent_id = Some(object_id);
                normalized.amount_minor = object.get("amount").and_then(Value::as_i64);
                normalized.failure_reason = object
                    .get("last_payment_error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                normalized.outcome = PaymentOutcome::Failed;
            }
            ProviderEventKind::ChargeRefunded => {
                normalized.charge_id = Some(object_id);
                normalized.payment_intent_id = reference_field(object, "payment_intent");
                normalized.amount_minor = object.get("amount_refunded").and_then(Value::as_i64);
                // Partial refunds leave `refunded` false; access stays.
                let fully_refunded = object
                    .get("refunded")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                normalized.outcome = if fully_refunded {
                    PaymentOutcome::Refunded
                } else {
                    PaymentOutcome::Ignored
                };
            }
            ProviderEventKind::Unknown => {}
        }

        Ok(normalized)
    }

    /// Provider references to try, most specific first.
    pub fn reference_candidates(&self) -> Vec<&str> {
        [&self.payment_intent_id, &self.session_id, &self.charge_id]
            .into_iter()
            .filter_map(|r| r.as_deref())
            .collect()
    }

    /// Reference to store on the transaction once the payment settles.
    pub fn settled_reference(&self) -> Option<&str> {
        self.reference_candidates().into_iter().next()
    }
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads a field that is either an id string or an expanded object with `id`.
fn reference_field(object: &Value, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(expanded) => expanded
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::ProviderEventBuilder;
    use serde_json::json;

    fn normalize(event_type: &str, object: Value) -> Result<PaymentEvent, WebhookError> {
        let event = ProviderEventBuilder::new()
            .event_type(event_type)
            .object(object)
            .build();
        PaymentEvent::from_provider(&event)
    }

    #[test]
    fn checkout_session_completed_reads_metadata() {
        let event = normalize(
            "checkout.session.completed",
            json!({
                "id": "cs_test_1",
                "payment_intent": "pi_1",
                "payment_status": "paid",
                "amount_total": 500,
                "currency": "usd",
                "metadata": {
                    "transaction_id": "101",
                    "user_id": "42",
                    "listing_id": "7",
                    "payment_type": "contact_reveal"
                }
            }),
        )
        .unwrap();

        assert_eq!(event.outcome, PaymentOutcome::Succeeded);
        assert_eq!(event.session_id.as_deref(), Some("cs_test_1"));
        assert_eq!(event.settled_reference(), Some("pi_1"));
        assert_eq!(event.amount_minor, Some(500));
        assert_eq!(event.metadata.transaction_id, Some(TransactionId::new(101)));
        assert_eq!(event.metadata.user_id, Some(UserId::new(42)));
        assert_eq!(event.metadata.listing_id, Some(ListingId::new(7)));
        assert_eq!(event.metadata.payment_type, Some(TransactionType::ContactReveal));
    }

    #[test]
    fn unpaid_session_is_ignored() {
        let event = normalize(
            "checkout.session.completed",
            json!({ "id": "cs_1", "payment_status": "unpaid" }),
        )
        .unwrap();
        assert_eq!(event.outcome, PaymentOutcome::Ignored);
    }

    #[test]
    fn session_without_payment_intent_settles_on_session_id() {
        let event = normalize("checkout.session.completed", json!({ "id": "cs_1" })).unwrap();
        assert_eq!(event.settled_reference(), Some("cs_1"));
    }

    #[test]
    fn payment_failed_carries_reason() {
        let event = normalize(
            "payment_intent.payment_failed",
            json!({
                "id": "pi_9",
                "last_payment_error": { "message": "Your card was declined." }
            }),
        )
        .unwrap();

        assert_eq!(event.outcome, PaymentOutcome::Failed);
        assert_eq!(event.reference_candidates(), vec!["pi_9"]);
        assert_eq!(event.failure_reason.as_deref(), Some("Your card was declined."));
    }

    #[test]
    fn charge_refunded_prefers_payment_intent() {
        let event = normalize(
            "charge.refunded",
            json!({ "id": "ch_1", "payment_intent": "pi_1", "refunded": true }),
        )
        .unwrap();

        assert_eq!(event.outcome, PaymentOutcome::Refunded);
        assert_eq!(event.reference_candidates(), vec!["pi_1", "ch_1"]);
    }

    #[test]
    fn partial_refund_is_ignored() {
        let event = normalize(
            "charge.refunded",
            json!({ "id": "ch_1", "payment_intent": "pi_1", "refunded": false, "amount_refunded": 100 }),
        )
        .unwrap();
        assert_eq!(event.outcome, PaymentOutcome::Ignored);
    }

    #[test]
    fn expanded_payment_intent_object_is_accepted() {
        let event = normalize(
            "charge.refunded",
            json!({ "id": "ch_1", "payment_intent": { "id": "pi_7" } }),
        )
        .unwrap();
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_7"));
    }

    #[test]
    fn recognized_event_without_id_is_malformed() {
        let result = normalize("payment_intent.succeeded", json!({ "amount": 500 }));
        assert!(matches!(result, Err(WebhookError::MalformedEvent(_))));
    }

    #[test]
    fn unknown_event_is_ignored_without_inspection() {
        let event = normalize("customer.created", json!({})).unwrap();
        assert_eq!(event.kind, ProviderEventKind::Unknown);
        assert_eq!(event.outcome, PaymentOutcome::Ignored);
    }

    #[test]
    fn garbage_metadata_is_dropped() {
        let metadata = CheckoutMetadata::from_value(Some(&json!({
            "transaction_id": "abc",
            "user_id": 42,
            "payment_type": "donation"
        })));
        assert_eq!(metadata, CheckoutMetadata::default());
    }
}
