use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::AppState;

use super::interface::AccountError;
use super::model::{Role, User};

/// Bearer-authenticated caller. The JWT subject is resolved back to a live
/// user row on every request, so a revoked account loses access immediately
/// even while its token is still unexpired.
pub struct AuthUser(pub User);

/// Bearer-authenticated caller holding the admin role.
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, AccountError> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AccountError::Unauthenticated)
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AccountError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state
            .jwt
            .verify_access_token(token)
            .map_err(|_| AccountError::Unauthenticated)?
            .claims;

        let user = state.accounts.require_account(&claims.sub).await?;
        Ok(AuthUser(user))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AccountError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AccountError::Unauthorized);
        }
        Ok(AdminUser(user))
    }
}
