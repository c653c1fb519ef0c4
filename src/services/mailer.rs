use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail request failed: {0}")]
    Request(String),

    #[error("Mail API rejected the message: {0}")]
    Rejected(String),
}

/// Outbound email boundary. Delivery failure is never fatal to the state
/// transition that preceded it; callers log and surface a soft warning.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns the provider's delivery id.
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String, MailError>;
}

/// Resend HTTP API client.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, api_key: String, from: String) -> Self {
        Self {
            client,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String, MailError> {
        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| MailError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!("{status}: {body}")));
        }

        let body: ResendResponse = response
            .json()
            .await
            .map_err(|e| MailError::Request(e.to_string()))?;

        tracing::info!(to, subject, delivery_id = %body.id, "email sent");
        Ok(body.id)
    }
}

/// Logs instead of sending. Used when no API key is configured.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<String, MailError> {
        tracing::warn!(to, subject, "mail delivery disabled, message dropped");
        Ok("noop".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Captures messages for assertions; can be switched into a failing mode to
/// exercise the soft-warning path.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<RecordedMail>>,
    fail: Mutex<bool>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<RecordedMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String, MailError> {
        if *self.fail.lock().unwrap() {
            return Err(MailError::Rejected("simulated delivery failure".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(RecordedMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(format!("recorded-{}", sent.len()))
    }
}

// =============================================================================
// TEMPLATES
// =============================================================================

pub fn verification_email(name: &str, code: &str) -> (String, String) {
    let subject = "Confirm your intranet account".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px; max-width: 600px;">
  <h2>Hello, {name}!</h2>
  <p>Use the code below to confirm your email address. It expires in 24 hours.</p>
  <div style="background: #f0f9ff; padding: 15px; border-radius: 8px; text-align: center;">
    <span style="font-size: 28px; letter-spacing: 6px;"><strong>{code}</strong></span>
  </div>
  <p style="font-size: 12px; color: #666;">If you did not create this account, ignore this message.</p>
</div>"#
    );
    (subject, html)
}

pub fn configuration_email(name: &str, link: &str) -> (String, String) {
    let subject = "Set up your intranet account".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px; max-width: 600px;">
  <h2>Welcome, {name}!</h2>
  <p>An account was created for you. Choose your password through the link below (valid for 24 hours).</p>
  <p style="text-align: center;">
    <a href="{link}" style="background: #1e40af; color: white; padding: 12px 24px; border-radius: 8px; text-decoration: none;">Activate my account</a>
  </p>
</div>"#
    );
    (subject, html)
}

pub fn reset_email(name: &str, code: &str) -> (String, String) {
    let subject = "Your password reset code".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px; max-width: 600px;">
  <h2>Hello, {name}.</h2>
  <p>Use the code below to reset your password. It expires in 30 minutes.</p>
  <div style="background: #f0f9ff; padding: 15px; border-radius: 8px; text-align: center;">
    <span style="font-size: 28px; letter-spacing: 6px;"><strong>{code}</strong></span>
  </div>
  <p style="font-size: 12px; color: #666;">If you did not request this, your password remains unchanged.</p>
</div>"#
    );
    (subject, html)
}

pub fn approval_email(name: &str, login_url: &str) -> (String, String) {
    let subject = "Your intranet access was approved".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px; max-width: 600px;">
  <h2>Good news, {name}!</h2>
  <p>An administrator approved your account. You can now log in.</p>
  <p style="text-align: center;">
    <a href="{login_url}" style="background: #10b981; color: white; padding: 12px 24px; border-radius: 8px; text-decoration: none;">Go to login</a>
  </p>
</div>"#
    );
    (subject, html)
}
