//! HTTP handlers for admin grant management and revenue reporting.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::ledger::{transaction_query, TransactionListParams};
use crate::adapters::http::middleware::AdminUser;
use crate::adapters::http::state::AppState;
use crate::domain::access::{AccessError, GrantOptions};
use crate::domain::foundation::{GrantId, ListingId, UserId};

use super::dto::{CreateGrantRequest, CreateGrantResponse, RevenueParams, RevokeGrantResponse};

/// POST /api/admin/grants
pub async fn create_grant(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<CreateGrantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut options = GrantOptions::default();
    if let Some(access_type) = request.access_type {
        options = options.with_access_type(access_type);
    }
    if let Some(expires_at) = request.expires_at {
        options = options.expiring_at(expires_at);
    }

    let outcome = state
        .access
        .grant_access(request.buyer_id, request.listing_id, options)
        .await?;

    tracing::info!(
        admin_id = %admin.user_id,
        buyer_id = %request.buyer_id,
        listing_id = %request.listing_id,
        grant_id = %outcome.id(),
        "manual grant issued"
    );

    let status = if outcome.is_new() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(CreateGrantResponse {
            grant_id: outcome.id(),
            created: outcome.is_new(),
        }),
    ))
}

/// DELETE /api/admin/grants/:id
pub async fn revoke_grant(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(grant_id): Path<GrantId>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.access.revoke_by_grant_id(grant_id).await? {
        return Err(AccessError::GrantNotFound(grant_id).into());
    }

    tracing::info!(admin_id = %admin.user_id, %grant_id, "grant revoked by admin");
    Ok(Json(RevokeGrantResponse { revoked: true }))
}

/// GET /api/admin/listings/:id/grants
pub async fn list_listing_grants(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(listing_id): Path<ListingId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.access.list_by_listing(listing_id).await?))
}

/// GET /api/admin/users/:id/grants
///
/// Active grants only.
pub async fn list_user_grants(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.access.list_by_buyer(user_id).await?))
}

/// GET /api/admin/revenue?period=&type=
pub async fn revenue_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<RevenueParams>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .transactions
        .revenue_stats(params.period.unwrap_or_default(), params.transaction_type)
        .await?;
    Ok(Json(stats))
}

/// GET /api/admin/users/:id/transactions
pub async fn list_user_transactions(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<UserId>,
    Query(params): Query<TransactionListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .transactions
        .list_for_user(user_id, &transaction_query(params))
        .await?;
    Ok(Json(page))
}
