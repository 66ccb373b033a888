//! Request extractors for the calling user.
//!
//! Identity comes from the `X-User-Id` header set by the marketplace gateway
//! after it has authenticated the session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::foundation::UserId;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::AppState;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Any authenticated user.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<UserId>().ok())
            .ok_or_else(ApiError::unauthorized)?;

        Ok(AuthenticatedUser { user_id })
    }
}

/// An authenticated user flagged as admin in the user directory.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: UserId,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !state.access.is_admin(user.user_id).await? {
            tracing::warn!(user_id = %user.user_id, "admin endpoint refused");
            return Err(ApiError::forbidden(
                "admin_required",
                "This operation requires an administrator",
            ));
        }

        Ok(AdminUser {
            user_id: user.user_id,
        })
    }
}
