use async_trait::async_trait;
use sqlx::{MySql, Pool};

use super::interface::{Result, TokenRepository, UserRepository};
use super::model::{AccountToken, TokenPurpose, User};

pub struct UserCrud {
    pool: Pool<MySql>,
}

impl UserCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for UserCrud {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, full_name, login_email, password_hash, collaborator_kind,
                 role, email_verified, admin_approved, active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.full_name)
        .bind(&user.login_email)
        .bind(&user.password_hash)
        .bind(user.collaborator_kind)
        .bind(user.role)
        .bind(user.email_verified)
        .bind(user.admin_approved)
        .bind(user.active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE login_email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE login_email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(result.0 > 0)
    }

    async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_pending_approval(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE collaborator_kind = 'intern'
              AND email_verified = TRUE
              AND admin_approved = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn set_email_verified(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET email_verified = TRUE WHERE id = ? AND email_verified = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn approve_intern(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET admin_approved = TRUE
            WHERE id = ?
              AND collaborator_kind = 'intern'
              AND email_verified = TRUE
              AND admin_approved = FALSE
              AND active = TRUE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, user_id: &str, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET active = ? WHERE id = ? AND active = ?")
            .bind(active)
            .bind(user_id)
            .bind(!active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_password_hash(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn configure(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, email_verified = TRUE WHERE id = ?",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        // account_tokens rows go with the user via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct TokenCrud {
    pool: Pool<MySql>,
}

impl TokenCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for TokenCrud {
    async fn create(&self, token: &AccountToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO account_tokens
                (id, user_id, purpose, secret, issued_at, expires_at, consumed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(token.purpose)
        .bind(&token.secret)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.consumed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_secret(
        &self,
        purpose: TokenPurpose,
        secret: &str,
    ) -> Result<Option<AccountToken>> {
        let token = sqlx::query_as::<_, AccountToken>(
            "SELECT * FROM account_tokens WHERE purpose = ? AND secret = ?",
        )
        .bind(purpose)
        .bind(secret)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn supersede(&self, user_id: &str, purpose: TokenPurpose) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE account_tokens SET consumed = TRUE
            WHERE user_id = ? AND purpose = ? AND consumed = FALSE
            "#,
        )
        .bind(user_id)
        .bind(purpose)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn consume(&self, purpose: TokenPurpose, secret: &str) -> Result<bool> {
        // Compare-and-set: of two racing redemptions only one sees
        // rows_affected = 1.
        let result = sqlx::query(
            r#"
            UPDATE account_tokens SET consumed = TRUE
            WHERE purpose = ? AND secret = ? AND consumed = FALSE
            "#,
        )
        .bind(purpose)
        .bind(secret)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_expired_unconsumed(&self, purpose: TokenPurpose) -> Result<Vec<AccountToken>> {
        let tokens = sqlx::query_as::<_, AccountToken>(
            r#"
            SELECT * FROM account_tokens
            WHERE purpose = ? AND consumed = FALSE AND expires_at < NOW()
            ORDER BY expires_at DESC
            "#,
        )
        .bind(purpose)
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM account_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
