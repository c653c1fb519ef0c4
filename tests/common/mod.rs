use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use intranet_accounts::modules::accounts::interface::{TokenRepository, UserRepository};
use intranet_accounts::modules::accounts::memory::{MemoryTokenRepo, MemoryUserRepo};
use intranet_accounts::modules::accounts::model::{CollaboratorKind, Role, TokenPurpose, User};
use intranet_accounts::modules::accounts::{AccountService, ServiceSettings};
use intranet_accounts::services::hashing;
use intranet_accounts::services::jwt::JwtService;
use intranet_accounts::services::mailer::RecordingMailer;

#[allow(dead_code)]
pub const CORPORATE_DOMAIN: &str = "resendemh.com.br";

// Allow dead_code for utilities used by other test files
#[allow(dead_code)]
pub struct TestContext {
    pub server: TestServer,
    pub users: Arc<MemoryUserRepo>,
    pub tokens: Arc<MemoryTokenRepo>,
    pub mailer: Arc<RecordingMailer>,
    pub accounts: AccountService,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        let users = Arc::new(MemoryUserRepo::new());
        let tokens = Arc::new(MemoryTokenRepo::new());
        let mailer = Arc::new(RecordingMailer::new());

        let jwt = JwtService::new("test-secret-key-for-testing-only".to_string());
        let accounts = AccountService::new(
            users.clone(),
            tokens.clone(),
            mailer.clone(),
            jwt.clone(),
            ServiceSettings {
                corporate_email_domain: CORPORATE_DOMAIN.to_string(),
                app_base_url: "http://localhost:8080".to_string(),
            },
        );

        let app = intranet_accounts::create_app(accounts.clone(), jwt).await;
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            users,
            tokens,
            mailer,
            accounts,
        }
    }

    /// Seeds an already-active admin directly through the repository (the
    /// first admin of a deployment is created out-of-band) and logs them in.
    pub async fn admin_token(&self) -> String {
        let email = format!("admin_{}@{}", Uuid::new_v4(), CORPORATE_DOMAIN);
        let admin = User {
            id: Uuid::new_v4().to_string(),
            full_name: "Test Admin".to_string(),
            login_email: email.clone(),
            password_hash: Some(hashing::hash_password(test_password()).unwrap()),
            collaborator_kind: CollaboratorKind::SalariedOrPartner,
            role: Role::Admin,
            email_verified: true,
            admin_approved: false,
            active: true,
            created_at: Utc::now(),
        };
        self.users.create(&admin).await.unwrap();

        let response = self
            .server
            .post("/auth/login")
            .json(&json!({ "email": email, "password": test_password() }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn user_id(&self, email: &str) -> String {
        self.users
            .find_by_email(email)
            .await
            .unwrap()
            .expect("user not found")
            .id
    }

    pub async fn user(&self, email: &str) -> User {
        self.users
            .find_by_email(email)
            .await
            .unwrap()
            .expect("user not found")
    }

    /// Secret of the most recently issued token for the pair, i.e. the code
    /// that would have arrived by email.
    pub async fn latest_secret(&self, email: &str, purpose: TokenPurpose) -> String {
        let user_id = self.user_id(email).await;
        self.tokens
            .latest_for(&user_id, purpose)
            .expect("no token issued")
            .secret
    }

    pub async fn register(&self, email: &str, kind: &str) {
        let response = self
            .server
            .post("/auth/register")
            .json(&json!({
                "full_name": "Test User",
                "email": email,
                "password": test_password(),
                "password_confirm": test_password(),
                "collaborator_kind": kind
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
    }

    pub async fn verify_email(&self, email: &str) {
        let code = self
            .latest_secret(email, TokenPurpose::EmailVerification)
            .await;
        let response = self
            .server
            .post("/auth/verify-email")
            .json(&json!({ "email": email, "code": code }))
            .await;
        response.assert_status_ok();
    }

    /// Plants a token row directly so expiry can be back-dated.
    pub async fn insert_token(
        &self,
        email: &str,
        purpose: TokenPurpose,
        secret: &str,
        expires_in_secs: i64,
    ) {
        let user_id = self.user_id(email).await;
        let now = Utc::now();
        self.tokens
            .create(&intranet_accounts::modules::accounts::model::AccountToken {
                id: Uuid::new_v4().to_string(),
                user_id,
                purpose,
                secret: secret.to_string(),
                issued_at: now,
                expires_at: now + chrono::Duration::seconds(expires_in_secs),
                consumed: false,
            })
            .await
            .unwrap();
    }
}

// Helper to generate unique test email
#[allow(dead_code)]
pub fn test_email() -> String {
    format!("test_{}@example.com", Uuid::new_v4())
}

// Helper to generate a unique corporate-domain email (salaried/partner)
#[allow(dead_code)]
pub fn corporate_email() -> String {
    format!("staff_{}@{}", Uuid::new_v4(), CORPORATE_DOMAIN)
}

// Helper to generate test password
#[allow(dead_code)]
pub fn test_password() -> &'static str {
    "TestPassword123!"
}
