//! Stripe payment adapters.
//!
//! - `StripeCheckoutAdapter` - hosted checkout sessions over the Stripe REST API
//! - `MockPaymentProvider` - deterministic sessions for tests and local runs
//!
//! Webhook verification lives in `domain::webhook`; it needs only the signing
//! secret, not the API client.

mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::MockPaymentProvider;
pub use stripe_adapter::{StripeCheckoutAdapter, StripeConfig};
