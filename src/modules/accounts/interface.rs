use async_trait::async_trait;
use axum::{http::StatusCode, response::IntoResponse, Json};

use super::model::{AccountToken, TokenPurpose, User};
use super::schema::ErrorResponse;

pub type Result<T> = std::result::Result<T, AccountError>;

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn list_pending_approval(&self) -> Result<Vec<User>>;

    /// Mark the mailbox as verified. Returns false when the user no longer
    /// exists or was already verified.
    async fn set_email_verified(&self, user_id: &str) -> Result<bool>;

    /// Guarded approval: flips `admin_approved` only while the target is an
    /// email-verified, unapproved, active intern. Guard and mutation are one
    /// conditional update; false means the guard did not hold.
    async fn approve_intern(&self, user_id: &str) -> Result<bool>;

    /// Returns false when the flag already had the requested value.
    async fn set_active(&self, user_id: &str, active: bool) -> Result<bool>;

    async fn set_password_hash(&self, user_id: &str, password_hash: &str) -> Result<bool>;

    /// Configuration-link redemption: sets the password and marks the
    /// mailbox verified in one update.
    async fn configure(&self, user_id: &str, password_hash: &str) -> Result<bool>;

    async fn delete(&self, user_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn create(&self, token: &AccountToken) -> Result<()>;
    async fn find_by_secret(&self, purpose: TokenPurpose, secret: &str)
        -> Result<Option<AccountToken>>;

    /// Mark every unconsumed token of this (user, purpose) pair consumed.
    /// Returns how many were superseded.
    async fn supersede(&self, user_id: &str, purpose: TokenPurpose) -> Result<u64>;

    /// Compare-and-set on `consumed`: true iff this call flipped the flag.
    /// Two racing redemptions of the same secret resolve here.
    async fn consume(&self, purpose: TokenPurpose, secret: &str) -> Result<bool>;

    /// Expired-and-never-redeemed tokens of one purpose, newest first.
    async fn list_expired_unconsumed(&self, purpose: TokenPurpose) -> Result<Vec<AccountToken>>;

    /// Remove every token a user owns. The MySQL schema also cascades this
    /// on user deletion; backends without foreign keys rely on it.
    async fn delete_for_user(&self, user_id: &str) -> Result<u64>;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("Verification code not found")]
    TokenNotFound,

    #[error("Verification code expired")]
    TokenExpired,

    #[error("Verification code already used")]
    TokenAlreadyUsed,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Missing or invalid bearer token")]
    Unauthenticated,

    #[error("Admin role required")]
    Unauthorized,

    #[error("{0}")]
    NotEligible(String),

    #[error("Email already registered")]
    Conflict,

    #[error("User not found")]
    UserNotFound,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Account awaiting admin approval")]
    PendingApproval,

    #[error("Account deactivated")]
    AccountDeactivated,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Jwt(String),
}

impl AccountError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::TokenNotFound | Self::TokenExpired | Self::TokenAlreadyUsed => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Unauthorized
            | Self::EmailNotVerified
            | Self::PendingApproval
            | Self::AccountDeactivated => StatusCode::FORBIDDEN,
            Self::NotEligible(_) | Self::Conflict => StatusCode::CONFLICT,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Hashing(_) | Self::Jwt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for clients; the Display string stays
    /// free to change wording.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::TokenNotFound => "token_not_found",
            Self::TokenExpired => "token_expired",
            Self::TokenAlreadyUsed => "token_already_used",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthenticated => "unauthenticated",
            Self::Unauthorized => "unauthorized",
            Self::NotEligible(_) => "not_eligible",
            Self::Conflict => "conflict",
            Self::UserNotFound => "user_not_found",
            Self::EmailNotVerified => "email_not_verified",
            Self::PendingApproval => "pending_approval",
            Self::AccountDeactivated => "account_deactivated",
            Self::Database(_) | Self::Hashing(_) | Self::Jwt(_) => "internal_error",
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse::with_message(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
