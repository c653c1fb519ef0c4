use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::modules::accounts::extractor::AdminUser;
use crate::modules::accounts::interface::AccountError;
use crate::AppState;

use super::schema::{
    AdminActionResponse, ApproveResponse, CreateUserRequest, CreateUserResponse,
    ExpiredTokenEntry, ExpiredTokensResponse, ResendConfigurationResponse, UserListResponse,
};

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<UserListResponse>, AccountError> {
    let users = state.accounts.list_users().await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
    }))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), AccountError> {
    req.validate()
        .map_err(|e| AccountError::Validation(e.to_string()))?;

    let (user, mail_warning) = state
        .accounts
        .admin_create_user(&req.full_name, &req.email, req.collaborator_kind, req.role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: user.into(),
            mail_warning,
        }),
    ))
}

pub async fn pending_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<UserListResponse>, AccountError> {
    let users = state.accounts.pending_approvals().await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
    }))
}

pub async fn approve_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ApproveResponse>, AccountError> {
    let mail_warning = state.accounts.approve(&id).await?;
    Ok(Json(ApproveResponse {
        message: "User approved",
        mail_warning,
    }))
}

pub async fn reject_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<AdminActionResponse>, AccountError> {
    state.accounts.reject(&id).await?;
    Ok(Json(AdminActionResponse {
        message: "Pending registration removed",
    }))
}

pub async fn revoke_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<AdminActionResponse>, AccountError> {
    state.accounts.revoke(&id).await?;
    Ok(Json(AdminActionResponse {
        message: "Access revoked",
    }))
}

pub async fn reactivate_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<AdminActionResponse>, AccountError> {
    state.accounts.reactivate(&id).await?;
    Ok(Json(AdminActionResponse {
        message: "Access restored",
    }))
}

pub async fn resend_configuration(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ResendConfigurationResponse>, AccountError> {
    let mail_warning = state.accounts.resend_configuration(&id).await?;
    Ok(Json(ResendConfigurationResponse {
        message: "Configuration link sent",
        mail_warning,
    }))
}

pub async fn expired_tokens(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<ExpiredTokensResponse>, AccountError> {
    let entries = state.accounts.expired_configuration_tokens().await?;
    let tokens = entries
        .into_iter()
        .map(|(token, user)| ExpiredTokenEntry {
            token_id: token.id,
            user_id: token.user_id,
            user_email: user.as_ref().map(|u| u.login_email.clone()),
            user_name: user.map(|u| u.full_name),
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        })
        .collect();
    Ok(Json(ExpiredTokensResponse { tokens }))
}
