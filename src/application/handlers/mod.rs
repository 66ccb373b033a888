//! Application handlers, grouped by bounded context.

pub mod access;
pub mod checkout;
pub mod ledger;
pub mod messaging;
pub mod webhook;

pub use access::{AccessGrantManager, ContactRevealHandler, GetContactQuery};
pub use checkout::{
    CheckoutError, CheckoutSessionInitiator, CheckoutSettings, CheckoutStarted,
    StartCheckoutCommand,
};
pub use ledger::{LogPaymentCommand, TransactionManager};
pub use messaging::{ListMessagesHandler, MessagingGate, SendMessageCommand, SendMessageHandler};
pub use webhook::{ReconcileOutcome, ReconcilerSettings, WebhookReconciler};
