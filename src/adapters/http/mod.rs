//! HTTP adapters - REST API implementations.
//!
//! Route groups:
//! - `ledger` - checkout, contact reveal, messaging, transaction history
//! - `admin` - manual grants and revenue reporting
//! - webhooks - provider deliveries, signature verified instead of user auth

pub mod admin;
pub mod error;
pub mod ledger;
pub mod middleware;
mod state;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

pub use error::{ApiError, ErrorResponse};
pub use state::{AppState, Services};

/// Builds the full `/api` router.
pub fn api_router(state: AppState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .merge(ledger::ledger_routes())
        .nest("/admin", admin::admin_routes())
        .nest("/webhooks", ledger::webhook_routes());

    Router::new()
        .nest("/api", api)
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
        ]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
