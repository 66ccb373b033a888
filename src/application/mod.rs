//! Application layer - handlers that orchestrate domain operations over ports.
//!
//! Every handler receives its ports as `Arc<dyn Port>` at construction and
//! holds no other state, so one instance serves all requests.

pub mod handlers;
mod notifier;
mod sweeper;

pub use handlers::{
    // Access
    AccessGrantManager, ContactRevealHandler, GetContactQuery,
    // Checkout
    CheckoutError, CheckoutSessionInitiator, CheckoutSettings, CheckoutStarted,
    StartCheckoutCommand,
    // Ledger
    LogPaymentCommand, TransactionManager,
    // Messaging
    ListMessagesHandler, MessagingGate, SendMessageCommand, SendMessageHandler,
    // Webhook
    ReconcileOutcome, ReconcilerSettings, WebhookReconciler,
};
pub use notifier::EventNotifier;
pub use sweeper::{GrantExpirySweeper, SweepReport};
