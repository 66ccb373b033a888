//! Integration tests for the HTTP API.
//!
//! Requests go through the full router with in-memory stores and the mock
//! payment provider:
//! 1. Checkout records a pending transaction and returns the hosted URL
//! 2. A signed webhook settles it and unlocks the seller's contact details
//! 3. Messaging and admin routes enforce their access rules

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use contact_ledger::adapters::events::InMemoryEventPublisher;
use contact_ledger::adapters::http::{api_router, AppState, Services};
use contact_ledger::adapters::memory::{
    InMemoryAccessGrantRepository, InMemoryListingDirectory, InMemoryMessageRepository,
    InMemoryTransactionRepository, InMemoryUserDirectory, InMemoryWebhookEventRepository,
};
use contact_ledger::adapters::stripe::MockPaymentProvider;
use contact_ledger::config::AppConfig;
use contact_ledger::domain::foundation::{ListingId, UserId};
use contact_ledger::domain::webhook::sign_payload;

// =============================================================================
// Test Infrastructure
// =============================================================================

const SECRET: &str = "whsec_http_test";
const OWNER: UserId = UserId::new(1);
const BUYER: UserId = UserId::new(42);
const STRANGER: UserId = UserId::new(43);
const ADMIN: UserId = UserId::new(900);
const LISTING: ListingId = ListingId::new(7);

async fn app() -> Router {
    let listings = Arc::new(InMemoryListingDirectory::new());
    listings.add_listing(LISTING, OWNER).await;

    let users = Arc::new(InMemoryUserDirectory::new());
    for user in [OWNER, BUYER, STRANGER] {
        users.add_user(user).await;
    }
    users.add_admin(ADMIN).await;

    let services = Services {
        transactions: Arc::new(InMemoryTransactionRepository::starting_at(101)),
        grants: Arc::new(InMemoryAccessGrantRepository::new()),
        listings,
        users,
        messages: Arc::new(InMemoryMessageRepository::new()),
        webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
        publisher: Arc::new(InMemoryEventPublisher::new()),
        payment_provider: Arc::new(MockPaymentProvider::new()),
    };

    let mut config = AppConfig::default();
    config.payment.stripe_webhook_secret = Some(SecretString::new(SECRET.to_string()));

    let state = AppState::build(&services, &config).unwrap();
    api_router(state, &config.server)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, user: UserId) -> Request<Body> {
    Request::get(uri)
        .header("X-User-Id", user.to_string())
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, user: UserId, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("X-User-Id", user.to_string())
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn completed_session_payload(event_id: &str) -> String {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": 1_704_067_200,
        "livemode": false,
        "data": {
            "object": {
                "id": "cs_test_101",
                "payment_intent": "pi_101",
                "payment_status": "paid",
                "amount_total": 500,
                "currency": "usd",
                "metadata": {
                    "transaction_id": "101",
                    "user_id": "42",
                    "listing_id": "7",
                    "payment_type": "contact_reveal"
                }
            }
        }
    })
    .to_string()
}

fn webhook(payload: String, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::post("/api/webhooks/stripe");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    builder.body(Body::from(payload)).unwrap()
}

fn signed_webhook(payload: String) -> Request<Body> {
    let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload);
    webhook(payload, Some(signature))
}

async fn buy_contact_reveal(app: &Router) {
    let (status, _) = send(app, post("/api/checkout", BUYER, json!({ "listing_id": 7 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(app, signed_webhook(completed_session_payload("evt_1"))).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Checkout and contact reveal
// =============================================================================

#[tokio::test]
async fn checkout_returns_hosted_session() {
    let app = app().await;

    let (status, body) = send(&app, post("/api/checkout", BUYER, json!({ "listing_id": 7 }))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["transaction_id"], 101);
    assert_eq!(body["session_id"], "cs_test_101");
    assert_eq!(
        body["checkout_url"],
        "https://checkout.example.test/pay/cs_test_101"
    );
}

#[tokio::test]
async fn checkout_rejects_unknown_payment_type() {
    let app = app().await;

    let (status, body) = send(
        &app,
        post(
            "/api/checkout",
            BUYER,
            json!({ "listing_id": 7, "payment_type": "donation" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_payment_type");
}

#[tokio::test]
async fn owner_cannot_check_out_own_listing() {
    let app = app().await;

    let (status, body) = send(&app, post("/api/checkout", OWNER, json!({ "listing_id": 7 }))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "self_purchase_denied");
}

#[tokio::test]
async fn unpaid_contact_request_gets_price() {
    let app = app().await;

    let (status, body) = send(&app, get("/api/listings/7/contact", BUYER)).await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], "payment_required");
    assert_eq!(body["details"]["currency"], "USD");
    assert!(body["details"]["price"].is_string());
}

#[tokio::test]
async fn settled_payment_reveals_contact() {
    let app = app().await;
    buy_contact_reveal(&app).await;

    let (status, body) = send(&app, get("/api/listings/7/contact", BUYER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "seller1@example.com");
    assert_eq!(body["granted_via"], "payment");

    let (_, access) = send(&app, get("/api/listings/7/access", BUYER)).await;
    assert_eq!(access, json!({ "has_access": true }));

    let (status, body) = send(&app, post("/api/checkout", BUYER, json!({ "listing_id": 7 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_has_access");
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let app = app().await;

    let request = Request::get("/api/listings/7/contact")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "authentication_required");
}

// =============================================================================
// Webhooks
// =============================================================================

#[tokio::test]
async fn replayed_webhook_is_acknowledged() {
    let app = app().await;
    buy_contact_reveal(&app).await;

    let (status, body) = send(&app, signed_webhook(completed_session_payload("evt_1"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));
}

#[tokio::test]
async fn unsigned_webhook_is_rejected() {
    let app = app().await;

    let (status, _) = send(&app, webhook(completed_session_payload("evt_1"), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forged_webhook_is_rejected() {
    let app = app().await;
    let payload = completed_session_payload("evt_1");
    let forged = sign_payload("whsec_wrong", chrono::Utc::now().timestamp(), &payload);

    let (status, _) = send(&app, webhook(payload, Some(forged))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, get("/api/listings/7/contact", BUYER)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

// =============================================================================
// Messaging
// =============================================================================

#[tokio::test]
async fn messaging_requires_access() {
    let app = app().await;
    buy_contact_reveal(&app).await;

    let (status, body) = send(
        &app,
        post("/api/listings/7/messages", BUYER, json!({ "body": "Still available?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipient_id"], 1);

    let (status, body) = send(
        &app,
        post("/api/listings/7/messages", STRANGER, json!({ "body": "Hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "access_required");

    let (status, body) = send(&app, get("/api/listings/7/messages", OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

// =============================================================================
// Transactions and admin
// =============================================================================

#[tokio::test]
async fn transaction_history_filters_by_status() {
    let app = app().await;
    buy_contact_reveal(&app).await;

    let (status, body) = send(&app, get("/api/transactions?status=completed", BUYER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["status"], "completed");

    let (_, body) = send(&app, get("/api/transactions?status=refunded", BUYER)).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn admin_routes_refuse_regular_users() {
    let app = app().await;

    let (status, body) = send(&app, get("/api/admin/revenue", BUYER)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "admin_required");
}

#[tokio::test]
async fn admin_grant_then_revoke() {
    let app = app().await;

    let (status, body) = send(
        &app,
        post(
            "/api/admin/grants",
            ADMIN,
            json!({ "buyer_id": 43, "listing_id": 7 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], true);
    let grant_id = body["grant_id"].as_i64().unwrap();

    let (_, body) = send(&app, get("/api/listings/7/contact", STRANGER)).await;
    assert_eq!(body["granted_via"], "manual");

    let (_, grants) = send(&app, get("/api/admin/listings/7/grants", ADMIN)).await;
    assert_eq!(grants.as_array().map(Vec::len), Some(1));

    let request = Request::delete(format!("/api/admin/grants/{}", grant_id))
        .header("X-User-Id", ADMIN.to_string())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/api/listings/7/contact", STRANGER)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn admin_revenue_counts_settled_purchases() {
    let app = app().await;
    buy_contact_reveal(&app).await;

    let (status, body) = send(&app, get("/api/admin/revenue?period=day", ADMIN)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "day");
    assert_eq!(body["count"], 1);
    assert_eq!(body["by_type"][0]["transaction_type"], "contact_reveal");
}

#[tokio::test]
async fn admin_sees_user_history() {
    let app = app().await;
    buy_contact_reveal(&app).await;

    let (status, body) = send(&app, get("/api/admin/users/42/transactions", ADMIN)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["buyer_id"], 42);
}
