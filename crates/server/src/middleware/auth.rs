//! Bearer token extractors.
//!
//! Handlers that need a caller take [`AuthUser`]; seller endpoints take
//! [`SellerUser`], which additionally requires the seller role. Both reject
//! with an [`AppError`] so failures use the standard JSON envelope.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use bazaar_core::{Email, Role, UserId};

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
///
/// ```rust,ignore
/// async fn handler(user: AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: Email,
    pub role: Role,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let claims = state.credentials().decode_token(token).map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            AppError::Unauthorized("invalid or expired token".to_string())
        })?;

        set_sentry_user(&claims.sub, Some(claims.email.as_str()));

        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// An authenticated caller holding the seller role.
#[derive(Debug, Clone)]
pub struct SellerUser(pub AuthUser);

impl FromRequestParts<AppState> for SellerUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_seller() {
            return Err(AppError::Forbidden("seller role required".to_string()));
        }
        Ok(Self(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
