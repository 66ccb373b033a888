//! HTTP handlers for checkout, contact reveal, messaging and payment webhooks.

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::AuthenticatedUser;
use crate::adapters::http::state::AppState;
use crate::application::{
    CheckoutError, GetContactQuery, ReconcileOutcome, SendMessageCommand, StartCheckoutCommand,
};
use crate::domain::foundation::ListingId;
use crate::domain::ledger::{TransactionQuery, TransactionType};
use crate::domain::listing::ContactReveal;

use super::dto::{
    AccessResponse, CheckoutRequest, CheckoutResponse, ContactResponse, PaymentRequiredDetails,
    SendMessageRequest, TransactionListParams, WebhookAck,
};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// POST /api/webhooks/stripe
///
/// Acknowledges with 200 once the event is applied, ignored or already seen.
/// Signature failures are 400; storage failures are 5xx so the provider retries.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.reconciler.handle(&body, signature).await?;

    match &outcome {
        ReconcileOutcome::Applied { transaction_id } => {
            tracing::debug!(%transaction_id, "webhook applied")
        }
        ReconcileOutcome::Ignored { reason } => tracing::debug!(%reason, "webhook ignored"),
        ReconcileOutcome::AlreadyProcessed => tracing::debug!("webhook replayed"),
    }

    Ok(Json(WebhookAck { received: true }))
}

/// POST /api/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_type = match request.payment_type.as_deref() {
        None => TransactionType::ContactReveal,
        Some(raw) => raw
            .parse::<TransactionType>()
            .map_err(|_| CheckoutError::InvalidPaymentType(raw.to_string()))?,
    };

    let started = state
        .checkout
        .handle(StartCheckoutCommand {
            buyer_id: user.user_id,
            listing_id: request.listing_id,
            payment_type,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            checkout_url: started.checkout_url,
            session_id: started.session_id,
            transaction_id: started.transaction_id,
        }),
    ))
}

/// GET /api/listings/:id/contact
///
/// 402 with the price when the viewer has not paid.
pub async fn get_contact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(listing_id): Path<ListingId>,
) -> Result<impl IntoResponse, ApiError> {
    let reveal = state
        .contact
        .handle(GetContactQuery {
            listing_id,
            viewer_id: user.user_id,
        })
        .await?;

    match reveal {
        ContactReveal::Revealed(contact) => Ok(Json(ContactResponse {
            email: contact.email,
            phone: contact.phone,
            granted_via: contact.granted_via,
        })),
        ContactReveal::PaymentRequired { price, currency } => {
            let details = serde_json::to_value(PaymentRequiredDetails { price, currency })
                .unwrap_or_default();
            Err(ApiError::new(
                StatusCode::PAYMENT_REQUIRED,
                "payment_required",
                "Purchase a contact reveal to see this seller's details",
            )
            .with_details(details))
        }
    }
}

/// GET /api/listings/:id/access
pub async fn check_access(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(listing_id): Path<ListingId>,
) -> Result<impl IntoResponse, ApiError> {
    let has_access = state.access.check_access(user.user_id, listing_id).await?;
    Ok(Json(AccessResponse { has_access }))
}

/// POST /api/listings/:id/messages
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(listing_id): Path<ListingId>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .send_message
        .handle(SendMessageCommand {
            sender_id: user.user_id,
            listing_id,
            recipient_id: request.recipient_id,
            body: request.body,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/listings/:id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(listing_id): Path<ListingId>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.list_messages.handle(listing_id, user.user_id).await?;
    Ok(Json(messages))
}

/// GET /api/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<TransactionListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .transactions
        .list_for_user(user.user_id, &transaction_query(params))
        .await?;
    Ok(Json(page))
}

/// Builds a history query from the request parameters.
pub fn transaction_query(params: TransactionListParams) -> TransactionQuery {
    let mut query = TransactionQuery::default().page(
        params.limit.unwrap_or(TransactionQuery::DEFAULT_LIMIT),
        params.offset.unwrap_or(0),
    );
    if let Some(transaction_type) = params.transaction_type {
        query = query.with_type(transaction_type);
    }
    if let Some(status) = params.status {
        query = query.with_status(status);
    }
    if let Some(order) = params.order {
        query = query.with_order(order);
    }
    query
}
