use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::services::{
    hashing,
    jwt::JwtService,
    mailer::{self, Mailer},
};

use super::interface::{AccountError, Result, TokenRepository, UserRepository};
use super::model::{AccountToken, CollaboratorKind, Role, TokenPurpose, User};
use super::tokens::TokenIssuer;

/// Deployment-specific knobs the lifecycle needs beyond its collaborators.
#[derive(Clone)]
pub struct ServiceSettings {
    /// Salaried/partner collaborators must register with an address under
    /// this domain; interns use their personal email.
    pub corporate_email_domain: String,
    /// Frontend origin used to build configuration and login links.
    pub app_base_url: String,
}

pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

/// The account lifecycle: registration, verification, the intern approval
/// gate, revocation, and the password flows. Every transition is guarded;
/// guard check and mutation land in a single conditional update on the
/// repository, so nothing is partially applied.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    issuer: TokenIssuer,
    mailer: Arc<dyn Mailer>,
    jwt: JwtService,
    settings: ServiceSettings,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        mailer: Arc<dyn Mailer>,
        jwt: JwtService,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            users,
            issuer: TokenIssuer::new(tokens),
            mailer,
            jwt,
            settings,
        }
    }

    // =========================================================================
    // REGISTRATION & VERIFICATION
    // =========================================================================

    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        kind: CollaboratorKind,
    ) -> Result<(User, Option<String>)> {
        self.check_email_domain(email, kind)?;

        if self.users.email_exists(email).await? {
            return Err(AccountError::Conflict);
        }

        let password_hash =
            hashing::hash_password(password).map_err(|e| AccountError::Hashing(e.to_string()))?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            login_email: email.to_string(),
            password_hash: Some(password_hash),
            collaborator_kind: kind,
            role: Role::RegularUser,
            email_verified: false,
            admin_approved: false,
            active: true,
            created_at: Utc::now(),
        };

        if let Err(e) = self.users.create(&user).await {
            // Two racing registrations can both pass email_exists; the unique
            // key on login_email settles it.
            if is_unique_violation(&e) {
                return Err(AccountError::Conflict);
            }
            return Err(e);
        }

        let issued = self
            .issuer
            .issue(&user.id, TokenPurpose::EmailVerification)
            .await?;
        let (subject, html) = mailer::verification_email(&user.full_name, &issued.secret);
        let warning = self.deliver(&user.login_email, &subject, &html).await;

        Ok((user, warning))
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Result<User> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AccountError::TokenNotFound)?;

        // Ownership is checked before consumption so a mismatched email
        // cannot burn someone else's code; the consume below still resolves
        // redemption races with its compare-and-set.
        let owner_id = self
            .issuer
            .validate(code, TokenPurpose::EmailVerification)
            .await?;
        if owner_id != user.id {
            return Err(AccountError::TokenNotFound);
        }
        self.issuer
            .consume(code, TokenPurpose::EmailVerification)
            .await?;

        self.users.set_email_verified(&user.id).await?;
        tracing::info!(user_id = %user.id, "email verified");

        self.users
            .find_by_id(&user.id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    pub async fn resend_verification(&self, email: &str) -> Result<Option<String>> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if user.email_verified {
            return Err(AccountError::NotEligible(
                "email is already verified".to_string(),
            ));
        }

        let issued = self
            .issuer
            .issue(&user.id, TokenPurpose::EmailVerification)
            .await?;
        let (subject, html) = mailer::verification_email(&user.full_name, &issued.secret);
        Ok(self.deliver(&user.login_email, &subject, &html).await)
    }

    // =========================================================================
    // LOGIN
    // =========================================================================

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        // An unconfigured account has no password to check against.
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AccountError::InvalidCredentials)?;

        let is_valid = hashing::verify_password(password, hash)
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        if !is_valid {
            return Err(AccountError::InvalidCredentials);
        }

        // Revocation overrides everything else.
        if !user.active {
            return Err(AccountError::AccountDeactivated);
        }
        if !user.email_verified {
            return Err(AccountError::EmailNotVerified);
        }
        if user.collaborator_kind == CollaboratorKind::Intern && !user.admin_approved {
            return Err(AccountError::PendingApproval);
        }

        let access_token = self
            .jwt
            .create_access_token(&user.id, &user.login_email, user.role)
            .map_err(|e| AccountError::Jwt(e.to_string()))?;

        Ok(LoginOutcome {
            user,
            access_token,
            expires_in: self.jwt.get_access_token_duration_secs(),
        })
    }

    /// Resolves a bearer subject back to a live user row. Used by the
    /// extractors on every authenticated request.
    pub async fn require_account(&self, user_id: &str) -> Result<User> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::Unauthenticated)?;
        if !user.can_authenticate() {
            return Err(AccountError::Unauthenticated);
        }
        Ok(user)
    }

    // =========================================================================
    // PASSWORD FLOWS
    // =========================================================================

    /// Always answers the same whether or not the address is registered, so
    /// the endpoint cannot be used to enumerate accounts.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>> {
        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::debug!(email, "reset requested for unknown email");
            return Ok(None);
        };

        let issued = self
            .issuer
            .issue(&user.id, TokenPurpose::PasswordReset)
            .await?;
        let (subject, html) = mailer::reset_email(&user.full_name, &issued.secret);
        Ok(self.deliver(&user.login_email, &subject, &html).await)
    }

    /// Step one of the two-step reset: checks the code without burning it.
    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<()> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AccountError::TokenNotFound)?;

        let owner_id = self
            .issuer
            .validate(code, TokenPurpose::PasswordReset)
            .await?;
        if owner_id != user.id {
            return Err(AccountError::TokenNotFound);
        }
        Ok(())
    }

    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AccountError::TokenNotFound)?;

        let owner_id = self
            .issuer
            .validate(code, TokenPurpose::PasswordReset)
            .await?;
        if owner_id != user.id {
            return Err(AccountError::TokenNotFound);
        }
        self.issuer
            .consume(code, TokenPurpose::PasswordReset)
            .await?;

        let password_hash = hashing::hash_password(new_password)
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        self.users.set_password_hash(&user.id, &password_hash).await?;
        tracing::info!(user_id = %user.id, "password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AccountError::InvalidCredentials)?;
        let is_valid = hashing::verify_password(current_password, hash)
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        if !is_valid {
            return Err(AccountError::InvalidCredentials);
        }

        let password_hash = hashing::hash_password(new_password)
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        self.users.set_password_hash(&user.id, &password_hash).await?;
        Ok(())
    }

    /// Redeems an account-configuration link: sets the password and marks
    /// the mailbox verified in one update (following the link proves the
    /// recipient owns the mailbox).
    pub async fn configure_account(&self, token: &str, password: &str) -> Result<User> {
        let user_id = self
            .issuer
            .consume(token, TokenPurpose::AccountConfiguration)
            .await?;

        let password_hash =
            hashing::hash_password(password).map_err(|e| AccountError::Hashing(e.to_string()))?;

        if !self.users.configure(&user_id, &password_hash).await? {
            return Err(AccountError::UserNotFound);
        }
        tracing::info!(user_id = %user_id, "account configured");

        self.users
            .find_by_id(&user_id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    // =========================================================================
    // ADMIN OPERATIONS
    // =========================================================================

    pub async fn admin_create_user(
        &self,
        full_name: &str,
        email: &str,
        kind: CollaboratorKind,
        role: Role,
    ) -> Result<(User, Option<String>)> {
        self.check_email_domain(email, kind)?;

        if self.users.email_exists(email).await? {
            return Err(AccountError::Conflict);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            login_email: email.to_string(),
            password_hash: None,
            collaborator_kind: kind,
            role,
            email_verified: false,
            admin_approved: false,
            active: true,
            created_at: Utc::now(),
        };

        if let Err(e) = self.users.create(&user).await {
            if is_unique_violation(&e) {
                return Err(AccountError::Conflict);
            }
            return Err(e);
        }

        let warning = self.send_configuration_link(&user).await?;
        Ok((user, warning))
    }

    /// The intern approval gate. Only admins reach this (enforced at the
    /// extractor); here we enforce eligibility of the target. The
    /// notification is fanned out after the transition commits, so a mail
    /// failure never rolls back an approval.
    pub async fn approve(&self, target_id: &str) -> Result<Option<String>> {
        let target = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if target.collaborator_kind != CollaboratorKind::Intern {
            return Err(AccountError::NotEligible(
                "only intern accounts require approval".to_string(),
            ));
        }
        if !target.active {
            return Err(AccountError::NotEligible(
                "user account is deactivated".to_string(),
            ));
        }
        if !target.email_verified {
            return Err(AccountError::NotEligible(
                "user has not verified their email yet".to_string(),
            ));
        }
        if target.admin_approved {
            return Err(AccountError::NotEligible(
                "user is already approved".to_string(),
            ));
        }

        if !self.users.approve_intern(target_id).await? {
            // Guard re-checked inside the conditional update; a concurrent
            // transition got there first.
            return Err(AccountError::NotEligible(
                "user is no longer eligible for approval".to_string(),
            ));
        }
        tracing::info!(user_id = target_id, "intern approved");

        let login_url = format!("{}/login", self.settings.app_base_url);
        let (subject, html) = mailer::approval_email(&target.full_name, &login_url);
        Ok(self.deliver(&target.login_email, &subject, &html).await)
    }

    /// Rejecting a pending registration hard-deletes the row. Only valid
    /// while the account never became usable: unverified, or an intern still
    /// awaiting approval.
    pub async fn reject(&self, target_id: &str) -> Result<()> {
        let target = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        let still_pending = !target.email_verified || target.pending_approval();
        if !still_pending {
            return Err(AccountError::NotEligible(
                "user already has an active account".to_string(),
            ));
        }

        self.issuer.delete_tokens_for(target_id).await?;
        self.users.delete(target_id).await?;
        tracing::info!(user_id = target_id, "pending registration rejected");
        Ok(())
    }

    /// Revocation clears `active` only; verification and approval history is
    /// preserved so reactivation needs no re-verification.
    pub async fn revoke(&self, target_id: &str) -> Result<()> {
        let target = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;
        if !target.active {
            return Err(AccountError::NotEligible(
                "user is already deactivated".to_string(),
            ));
        }
        if !self.users.set_active(target_id, false).await? {
            return Err(AccountError::NotEligible(
                "user is already deactivated".to_string(),
            ));
        }
        tracing::info!(user_id = target_id, "access revoked");
        Ok(())
    }

    pub async fn reactivate(&self, target_id: &str) -> Result<()> {
        let target = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;
        if target.active {
            return Err(AccountError::NotEligible(
                "user is already active".to_string(),
            ));
        }
        if !self.users.set_active(target_id, true).await? {
            return Err(AccountError::NotEligible(
                "user is already active".to_string(),
            ));
        }
        tracing::info!(user_id = target_id, "access reactivated");
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users.list().await
    }

    pub async fn pending_approvals(&self) -> Result<Vec<User>> {
        self.users.list_pending_approval().await
    }

    pub async fn resend_configuration(&self, target_id: &str) -> Result<Option<String>> {
        let target = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if target.password_hash.is_some() {
            return Err(AccountError::NotEligible(
                "user has already configured their account".to_string(),
            ));
        }

        self.send_configuration_link(&target).await
    }

    /// Expired, never-redeemed configuration links joined with their owners,
    /// for the admin panel's manual-resend view.
    pub async fn expired_configuration_tokens(
        &self,
    ) -> Result<Vec<(AccountToken, Option<User>)>> {
        let tokens = self
            .issuer
            .list_expired_unconsumed(TokenPurpose::AccountConfiguration)
            .await?;

        let mut entries = Vec::with_capacity(tokens.len());
        for token in tokens {
            let user = self.users.find_by_id(&token.user_id).await?;
            entries.push((token, user));
        }
        Ok(entries)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn check_email_domain(&self, email: &str, kind: CollaboratorKind) -> Result<()> {
        if kind == CollaboratorKind::SalariedOrPartner {
            let domain = format!("@{}", self.settings.corporate_email_domain);
            if !email.to_lowercase().ends_with(&domain) {
                return Err(AccountError::Validation(format!(
                    "Salaried and partner accounts must use a {} email",
                    self.settings.corporate_email_domain
                )));
            }
        }
        Ok(())
    }

    async fn send_configuration_link(&self, user: &User) -> Result<Option<String>> {
        let issued = self
            .issuer
            .issue(&user.id, TokenPurpose::AccountConfiguration)
            .await?;
        let link = format!(
            "{}/configure-account?token={}",
            self.settings.app_base_url, issued.secret
        );
        let (subject, html) = mailer::configuration_email(&user.full_name, &link);
        Ok(self.deliver(&user.login_email, &subject, &html).await)
    }

    /// Delivery failure downgrades to a warning the caller can surface; the
    /// state transition it follows has already committed.
    async fn deliver(&self, to: &str, subject: &str, html: &str) -> Option<String> {
        match self.mailer.send(to, subject, html).await {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(to, error = %e, "notification email failed");
                Some(format!("notification email failed to send: {e}"))
            }
        }
    }
}

fn is_unique_violation(err: &AccountError) -> bool {
    match err {
        AccountError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}
