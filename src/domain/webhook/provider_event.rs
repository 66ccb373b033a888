//! Raw provider webhook envelope.
//!
//! Only fields the reconciler reads are captured; the rest of the provider
//! schema is ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Provider event id (`evt_...`), unique per real-world event.
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds.
    pub created: i64,

    pub data: ProviderEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEventData {
    /// The object that triggered the event; its shape depends on `type`.
    pub object: serde_json::Value,
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        ProviderEventKind::parse(&self.event_type)
    }
}

/// Event types the reconciler acts on. Everything else is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEventKind {
    CheckoutSessionCompleted,
    PaymentIntentSucceeded,
    PaymentIntentFailed,
    ChargeRefunded,
    Unknown,
}

impl ProviderEventKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentIntentFailed,
            "charge.refunded" => Self::ChargeRefunded,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentFailed => "payment_intent.payment_failed",
            Self::ChargeRefunded => "charge.refunded",
            Self::Unknown => "unknown",
        }
    }
}

/// Builds provider events for tests and local replay tooling.
pub struct ProviderEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

impl Default for ProviderEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

impl ProviderEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> ProviderEvent {
        ProviderEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: ProviderEventData {
                object: self.object,
            },
            livemode: self.livemode,
            api_version: Some("2023-10-16".to_string()),
        }
    }

    /// Serialized JSON body, as the provider would send it.
    pub fn to_payload(self) -> String {
        serde_json::to_string(&self.build()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_minimal_event() {
        let json = r#"{
            "id": "evt_1",
            "type": "charge.refunded",
            "created": 1704067200,
            "data": { "object": { "id": "ch_1" } }
        }"#;

        let event: ProviderEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "evt_1");
        assert_eq!(event.kind(), ProviderEventKind::ChargeRefunded);
        assert!(!event.livemode);
        assert!(event.api_version.is_none());
    }

    #[test]
    fn unknown_types_map_to_unknown() {
        assert_eq!(
            ProviderEventKind::parse("customer.created"),
            ProviderEventKind::Unknown
        );
    }

    #[test]
    fn kind_round_trips_through_as_str() {
        for kind in [
            ProviderEventKind::CheckoutSessionCompleted,
            ProviderEventKind::PaymentIntentSucceeded,
            ProviderEventKind::PaymentIntentFailed,
            ProviderEventKind::ChargeRefunded,
        ] {
            assert_eq!(ProviderEventKind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn builder_produces_parseable_payload() {
        let payload = ProviderEventBuilder::new()
            .id("evt_built")
            .event_type("payment_intent.succeeded")
            .object(json!({ "id": "pi_1" }))
            .to_payload();

        let event: ProviderEvent = serde_json::from_str(&payload).unwrap();
        assert_eq!(event.id, "evt_built");
        assert_eq!(event.data.object["id"], "pi_1");
    }
}
