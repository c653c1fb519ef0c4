use std::sync::Arc;

use intranet_accounts::config::{init_db, Config};
use intranet_accounts::modules::accounts::crud::{TokenCrud, UserCrud};
use intranet_accounts::modules::accounts::{AccountService, ServiceSettings};
use intranet_accounts::services::jwt::JwtService;
use intranet_accounts::services::mailer::{Mailer, NoopMailer, ResendMailer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intranet_accounts=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load environment configuration");

    let db = init_db(&config.database_url)
        .await
        .expect("Failed to connect to MySQL");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Connected to MySQL");

    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(
            reqwest::Client::new(),
            key.clone(),
            config.mail_from.clone(),
        )),
        None => {
            tracing::warn!("RESEND_API_KEY not set, outbound email disabled");
            Arc::new(NoopMailer)
        }
    };

    let jwt = JwtService::new(config.jwt_secret.clone());
    let accounts = AccountService::new(
        Arc::new(UserCrud::new(db.clone())),
        Arc::new(TokenCrud::new(db)),
        mailer,
        jwt.clone(),
        ServiceSettings {
            corporate_email_domain: config.corporate_email_domain,
            app_base_url: config.app_base_url,
        },
    );

    let app = intranet_accounts::create_app(accounts, jwt).await;

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind 0.0.0.0:3000");
    tracing::info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.expect("Server error");
}
