use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

use crate::AppState;

use super::extractor::AuthUser;
use super::interface::AccountError;
use super::schema::{
    ChangePasswordRequest, ChangePasswordResponse, ConfigureAccountRequest,
    ConfigureAccountResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
    LoginResponse, RegisterRequest, RegisterResponse, ResendVerificationRequest,
    ResendVerificationResponse, ResetPasswordRequest, ResetPasswordResponse, UserResponse,
    VerifyEmailRequest, VerifyEmailResponse, VerifyResetCodeRequest, VerifyResetCodeResponse,
};

fn check_password(password: &str, password_confirm: &str) -> Result<(), AccountError> {
    if password != password_confirm {
        return Err(AccountError::Validation(
            "Passwords do not match".to_string(),
        ));
    }
    if password.len() < 8 {
        return Err(AccountError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AccountError> {
    req.validate()
        .map_err(|e| AccountError::Validation(e.to_string()))?;
    check_password(&req.password, &req.password_confirm)?;

    let (user, mail_warning) = state
        .accounts
        .register(&req.full_name, &req.email, &req.password, req.collaborator_kind)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.into(),
            mail_warning,
        }),
    ))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<(StatusCode, Json<VerifyEmailResponse>), AccountError> {
    req.validate()
        .map_err(|e| AccountError::Validation(e.to_string()))?;

    let user = state.accounts.verify_email(&req.email, &req.code).await?;

    Ok((
        StatusCode::OK,
        Json(VerifyEmailResponse {
            message: "Email verified",
            user: user.into(),
        }),
    ))
}

pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResendVerificationRequest>,
) -> Result<(StatusCode, Json<ResendVerificationResponse>), AccountError> {
    req.validate()
        .map_err(|e| AccountError::Validation(e.to_string()))?;

    let mail_warning = state.accounts.resend_verification(&req.email).await?;

    Ok((
        StatusCode::OK,
        Json(ResendVerificationResponse {
            message: "Verification code sent",
            mail_warning,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AccountError> {
    let result = state.accounts.login(&req.email, &req.password).await?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            access_token: result.access_token,
            token_type: "Bearer",
            expires_in: result.expires_in,
            user: result.user.into(),
        }),
    ))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<ForgotPasswordResponse>), AccountError> {
    req.validate()
        .map_err(|e| AccountError::Validation(e.to_string()))?;

    // Same answer whether or not the email exists.
    state.accounts.request_password_reset(&req.email).await?;

    Ok((
        StatusCode::OK,
        Json(ForgotPasswordResponse {
            message: "If the email is registered, a reset code was sent",
        }),
    ))
}

pub async fn verify_reset_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyResetCodeRequest>,
) -> Result<(StatusCode, Json<VerifyResetCodeResponse>), AccountError> {
    req.validate()
        .map_err(|e| AccountError::Validation(e.to_string()))?;

    state
        .accounts
        .verify_reset_code(&req.email, &req.code)
        .await?;

    Ok((
        StatusCode::OK,
        Json(VerifyResetCodeResponse {
            message: "Code is valid",
        }),
    ))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, Json<ResetPasswordResponse>), AccountError> {
    req.validate()
        .map_err(|e| AccountError::Validation(e.to_string()))?;
    check_password(&req.password, &req.password_confirm)?;

    state
        .accounts
        .reset_password(&req.email, &req.code, &req.password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ResetPasswordResponse {
            message: "Password updated",
        }),
    ))
}

pub async fn configure_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfigureAccountRequest>,
) -> Result<(StatusCode, Json<ConfigureAccountResponse>), AccountError> {
    check_password(&req.password, &req.password_confirm)?;

    let user = state
        .accounts
        .configure_account(&req.token, &req.password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ConfigureAccountResponse {
            message: "Account configured",
            user: user.into(),
        }),
    ))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<(StatusCode, Json<ChangePasswordResponse>), AccountError> {
    check_password(&req.new_password, &req.new_password_confirm)?;

    state
        .accounts
        .change_password(&user, &req.current_password, &req.new_password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ChangePasswordResponse {
            message: "Password updated",
        }),
    ))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}
