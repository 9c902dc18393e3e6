//! Bearer-token authentication extractors.
//!
//! Handlers take [`CurrentUser`] (any signed-in account) or
//! [`AdminUser`] (admin role) as a parameter; extraction verifies the
//! JWT against the configured secret and rejects with 401/403.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use mongodb::bson::oid::ObjectId;

use crate::auth;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::store::models::UserRole;

/// Identity established from a verified bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    fn from_bearer(state: &AppState, parts: &Parts) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        let claims = auth::verify_token(&state.config.auth, token).map_err(|error| {
            tracing::debug!(error = %error, "token rejected");
            ApiError::Unauthorized
        })?;

        let id = ObjectId::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;

        Ok(Self {
            id,
            email: claims.email,
            role: claims.role,
        })
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Self::from_bearer(state, parts)
    }
}

/// [`CurrentUser`] narrowed to the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_bearer(state, parts)?;
        if !user.role.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
