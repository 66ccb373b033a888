//! Axum router for admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{
    create_grant, list_listing_grants, list_user_grants, list_user_transactions, revenue_stats,
    revoke_grant,
};

/// Admin routes, mounted under `/api/admin`. Every route requires an admin caller.
///
/// # Routes
/// - `POST /grants` - Issue a manual grant
/// - `DELETE /grants/:id` - Revoke a grant
/// - `GET /listings/:id/grants` - Every grant on a listing
/// - `GET /users/:id/grants` - A buyer's active grants
/// - `GET /users/:id/transactions` - A user's payment history
/// - `GET /revenue` - Completed revenue for a period
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/grants", post(create_grant))
        .route("/grants/:id", delete(revoke_grant))
        .route("/listings/:id/grants", get(list_listing_grants))
        .route("/users/:id/grants", get(list_user_grants))
        .route("/users/:id/transactions", get(list_user_transactions))
        .route("/revenue", get(revenue_stats))
}
