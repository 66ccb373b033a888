//! Admin endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use routes::admin_routes;
