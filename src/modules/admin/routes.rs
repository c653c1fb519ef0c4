use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(controller::list_users).post(controller::create_user))
        .route("/users/pending", get(controller::pending_users))
        .route("/users/{id}/approve", post(controller::approve_user))
        .route("/users/{id}", delete(controller::reject_user))
        .route("/users/{id}/revoke", post(controller::revoke_user))
        .route("/users/{id}/reactivate", post(controller::reactivate_user))
        .route(
            "/users/{id}/resend-configuration",
            post(controller::resend_configuration),
        )
        .route("/tokens/expired", get(controller::expired_tokens))
}
