//! Checkout, contact reveal, messaging and webhook endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::{transaction_query, SIGNATURE_HEADER};
pub use routes::{ledger_routes, webhook_routes};
