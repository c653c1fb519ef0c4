//! In-memory repository backends. Used by the integration tests and handy
//! for running the server without a database; semantics mirror the MySQL
//! implementations in `crud.rs`, including the compare-and-set consume.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::interface::{Result, TokenRepository, UserRepository};
use super::model::{AccountToken, CollaboratorKind, TokenPurpose, User};

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepo {
    async fn create(&self, user: &User) -> Result<()> {
        self.users.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.login_email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.login_email == email))
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn list_pending_approval(&self) -> Result<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.pending_approval())
            .cloned()
            .collect())
    }

    async fn set_email_verified(&self, user_id: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users
            .iter_mut()
            .find(|u| u.id == user_id && !u.email_verified)
        {
            Some(user) => {
                user.email_verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn approve_intern(&self, user_id: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| {
            u.id == user_id
                && u.collaborator_kind == CollaboratorKind::Intern
                && u.email_verified
                && !u.admin_approved
                && u.active
        }) {
            Some(user) => {
                user.admin_approved = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_active(&self, user_id: &str, active: bool) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users
            .iter_mut()
            .find(|u| u.id == user_id && u.active != active)
        {
            Some(user) => {
                user.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_password_hash(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn configure(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                user.email_verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != user_id);
        Ok(users.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryTokenRepo {
    tokens: Mutex<Vec<AccountToken>>,
}

impl MemoryTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest token issued for a user and purpose, consumed or not. Lets
    /// tests read the secret that would normally arrive by email.
    pub fn latest_for(&self, user_id: &str, purpose: TokenPurpose) -> Option<AccountToken> {
        self.tokens
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|t| t.user_id == user_id && t.purpose == purpose)
            .cloned()
    }

}

#[async_trait]
impl TokenRepository for MemoryTokenRepo {
    async fn create(&self, token: &AccountToken) -> Result<()> {
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }

    async fn find_by_secret(
        &self,
        purpose: TokenPurpose,
        secret: &str,
    ) -> Result<Option<AccountToken>> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.purpose == purpose && t.secret == secret)
            .cloned())
    }

    async fn supersede(&self, user_id: &str, purpose: TokenPurpose) -> Result<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let mut count = 0;
        for token in tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.purpose == purpose && !t.consumed)
        {
            token.consumed = true;
            count += 1;
        }
        Ok(count)
    }

    async fn consume(&self, purpose: TokenPurpose, secret: &str) -> Result<bool> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens
            .iter_mut()
            .find(|t| t.purpose == purpose && t.secret == secret && !t.consumed)
        {
            Some(token) => {
                token.consumed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_expired_unconsumed(&self, purpose: TokenPurpose) -> Result<Vec<AccountToken>> {
        let now = Utc::now();
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.purpose == purpose && !t.consumed && t.expires_at < now)
            .cloned()
            .collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }
}
