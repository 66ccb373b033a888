//! Axum router for the marketplace-facing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{
    check_access, create_checkout, get_contact, handle_stripe_webhook, list_messages,
    list_transactions, send_message,
};

/// User routes, mounted under `/api`.
///
/// # Routes
/// - `POST /checkout` - Start a hosted checkout
/// - `GET /listings/:id/contact` - Contact details or the price to unlock them
/// - `GET /listings/:id/access` - Whether the caller may see contact details
/// - `POST /listings/:id/messages` - Message the other party on a listing
/// - `GET /listings/:id/messages` - Caller's messages on a listing
/// - `GET /transactions` - Caller's payment history
pub fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/listings/:id/contact", get(get_contact))
        .route("/listings/:id/access", get(check_access))
        .route(
            "/listings/:id/messages",
            post(send_message).get(list_messages),
        )
        .route("/transactions", get(list_transactions))
}

/// Provider webhooks. No user auth; deliveries are signature verified.
///
/// # Routes
/// - `POST /stripe` - Stripe event delivery
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}
