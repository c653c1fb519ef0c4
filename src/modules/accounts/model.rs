use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How a collaborator joined the company. Fixed at creation; decides which
/// activation path applies (interns need an admin approval on top of email
/// verification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CollaboratorKind {
    Intern,
    SalariedOrPartner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    RegularUser,
    Coordinator,
    Admin,
}

/// What a single-use secret is scoped to. Secrets from one purpose are never
/// valid for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    AccountConfiguration,
    PasswordReset,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub login_email: String,
    /// None until the account has been configured (admin-created users set
    /// their password through a configuration link).
    pub password_hash: Option<String>,
    pub collaborator_kind: CollaboratorKind,
    pub role: Role,
    pub email_verified: bool,
    pub admin_approved: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Derived predicate, not stored: an intern who verified their mailbox
    /// but has not been approved yet.
    pub fn pending_approval(&self) -> bool {
        self.collaborator_kind == CollaboratorKind::Intern
            && self.email_verified
            && !self.admin_approved
    }

    /// Whether the state machine allows this user to log in. Revocation
    /// overrides everything else.
    pub fn can_authenticate(&self) -> bool {
        self.active
            && self.email_verified
            && (self.collaborator_kind != CollaboratorKind::Intern || self.admin_approved)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AccountToken {
    pub id: String,
    pub user_id: String,
    pub purpose: TokenPurpose,
    pub secret: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set on redemption, and on supersession when a newer token of the same
    /// purpose is issued. Once true the token is permanently invalid.
    pub consumed: bool,
}
