use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::accounts::model::{CollaboratorKind, Role};
use crate::modules::accounts::schema::UserResponse;

// =============================================================================
// USER MANAGEMENT
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub collaborator_kind: CollaboratorKind,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::RegularUser
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminActionResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ResendConfigurationResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_warning: Option<String>,
}

// =============================================================================
// EXPIRED TOKENS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ExpiredTokenEntry {
    pub token_id: String,
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ExpiredTokensResponse {
    pub tokens: Vec<ExpiredTokenEntry>,
}
