use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(controller::register))
        .route("/verify-email", post(controller::verify_email))
        .route("/resend-verification", post(controller::resend_verification))
        .route("/login", post(controller::login))
        .route("/forgot-password", post(controller::forgot_password))
        .route("/verify-reset-code", post(controller::verify_reset_code))
        .route("/reset-password", post(controller::reset_password))
        .route("/configure-account", post(controller::configure_account))
        .route("/change-password", post(controller::change_password))
        .route("/me", get(controller::me))
}
