//! Webhook module - authenticating and normalizing payment provider events.

mod errors;
mod payment_event;
mod provider_event;
mod signature;

pub use errors::WebhookError;
pub use payment_event::{CheckoutMetadata, PaymentEvent, PaymentOutcome};
pub use provider_event::{ProviderEvent, ProviderEventBuilder, ProviderEventData, ProviderEventKind};
pub use signature::{sign_payload, SignatureHeader, WebhookVerifier};
