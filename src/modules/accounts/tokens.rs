use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use uuid::Uuid;

use super::interface::{AccountError, Result, TokenRepository};
use super::model::{AccountToken, TokenPurpose};

/// Verification and configuration links are good for a day.
const VERIFICATION_TTL_HOURS: i64 = 24;
const CONFIGURATION_TTL_HOURS: i64 = 24;
/// Reset codes are short-lived; 30 minutes is the operational choice.
const RESET_TTL_MINUTES: i64 = 30;

const CONFIGURATION_SECRET_LEN: usize = 40;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

/// Produces, validates, and consumes single-use secrets scoped to a purpose
/// and a user. Validation and consumption are separate so multi-step flows
/// (reset-code-then-new-password) can check a code without burning it.
#[derive(Clone)]
pub struct TokenIssuer {
    repo: Arc<dyn TokenRepository>,
}

impl TokenIssuer {
    pub fn new(repo: Arc<dyn TokenRepository>) -> Self {
        Self { repo }
    }

    /// Generates a fresh secret for the pair, superseding any unconsumed
    /// token of the same (user, purpose) first. The caller is responsible
    /// for delivering the secret out-of-band.
    pub async fn issue(&self, user_id: &str, purpose: TokenPurpose) -> Result<IssuedToken> {
        let superseded = self.repo.supersede(user_id, purpose).await?;
        if superseded > 0 {
            tracing::debug!(user_id, ?purpose, superseded, "superseded prior tokens");
        }

        let now = Utc::now();
        let token = AccountToken {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            purpose,
            secret: generate_secret(purpose),
            issued_at: now,
            expires_at: now + ttl(purpose),
            consumed: false,
        };
        self.repo.create(&token).await?;

        Ok(IssuedToken {
            secret: token.secret,
            expires_at: token.expires_at,
        })
    }

    /// Checks a secret without consuming it. Returns the owning user id.
    pub async fn validate(&self, secret: &str, purpose: TokenPurpose) -> Result<String> {
        let token = self
            .repo
            .find_by_secret(purpose, secret)
            .await?
            .ok_or(AccountError::TokenNotFound)?;

        if token.consumed {
            return Err(AccountError::TokenAlreadyUsed);
        }
        // Against the stored expires_at, never recomputed from issued_at, so
        // TTL changes do not retroactively touch issued tokens.
        if Utc::now() > token.expires_at {
            return Err(AccountError::TokenExpired);
        }

        Ok(token.user_id)
    }

    /// Validates and then flips `consumed` with a compare-and-set. Of two
    /// racing calls with the same secret, exactly one succeeds; the loser
    /// gets `TokenAlreadyUsed`.
    pub async fn consume(&self, secret: &str, purpose: TokenPurpose) -> Result<String> {
        let user_id = self.validate(secret, purpose).await?;

        if !self.repo.consume(purpose, secret).await? {
            return Err(AccountError::TokenAlreadyUsed);
        }

        Ok(user_id)
    }

    pub async fn list_expired_unconsumed(
        &self,
        purpose: TokenPurpose,
    ) -> Result<Vec<AccountToken>> {
        self.repo.list_expired_unconsumed(purpose).await
    }

    /// Drops every token a user owns, regardless of purpose or state. Used
    /// when a pending registration is rejected.
    pub async fn delete_tokens_for(&self, user_id: &str) -> Result<u64> {
        self.repo.delete_for_user(user_id).await
    }
}

fn ttl(purpose: TokenPurpose) -> Duration {
    match purpose {
        TokenPurpose::EmailVerification => Duration::hours(VERIFICATION_TTL_HOURS),
        TokenPurpose::AccountConfiguration => Duration::hours(CONFIGURATION_TTL_HOURS),
        TokenPurpose::PasswordReset => Duration::minutes(RESET_TTL_MINUTES),
    }
}

/// Human-entered codes are 6 numeric digits; configuration links carry a
/// longer alphanumeric secret since nobody types them.
fn generate_secret(purpose: TokenPurpose) -> String {
    match purpose {
        TokenPurpose::EmailVerification | TokenPurpose::PasswordReset => {
            format!("{:06}", rand::rng().random_range(0..1_000_000))
        }
        TokenPurpose::AccountConfiguration => rand::rng()
            .sample_iter(Alphanumeric)
            .take(CONFIGURATION_SECRET_LEN)
            .map(char::from)
            .collect(),
    }
}
