use std::env;

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub resend_api_key: Option<String>,
    pub mail_from: String,
    pub app_base_url: String,
    pub corporate_email_domain: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set".to_string())?;

        // Without a key the server still runs; emails are logged instead of sent.
        let resend_api_key = env::var("RESEND_API_KEY").ok();

        let mail_from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Intranet <onboarding@resend.dev>".to_string());

        let app_base_url = env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let corporate_email_domain = env::var("CORPORATE_EMAIL_DOMAIN")
            .unwrap_or_else(|_| "resendemh.com.br".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            resend_api_key,
            mail_from,
            app_base_url,
            corporate_email_domain,
        })
    }
}
