//! Webhook reconciliation.

mod reconciler;

pub use reconciler::{ReconcileOutcome, ReconcilerSettings, WebhookReconciler};
