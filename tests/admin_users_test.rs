mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{corporate_email, test_email, test_password, TestContext};
use intranet_accounts::modules::accounts::interface::UserRepository;
use intranet_accounts::modules::accounts::model::TokenPurpose;

#[tokio::test]
async fn admin_routes_reject_non_admin_callers() {
    let ctx = TestContext::new().await;

    // No bearer at all
    ctx.server
        .get("/admin/users")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Regular verified user
    let email = corporate_email();
    ctx.register(&email, "salaried_or_partner").await;
    ctx.verify_email(&email).await;
    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "email": &email, "password": test_password() }))
        .await;
    let body: serde_json::Value = response.json();
    let token = body["access_token"].as_str().unwrap();

    ctx.server
        .get("/admin/users")
        .authorization_bearer(token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_created_user_configures_account_through_link() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;
    let email = corporate_email();

    let response = ctx
        .server
        .post("/admin/users")
        .authorization_bearer(&admin)
        .json(&json!({
            "full_name": "New Hire",
            "email": &email,
            "collaborator_kind": "salaried_or_partner",
            "role": "coordinator"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["user"]["configured"], false);
    assert_eq!(body["user"]["email_verified"], false);

    // The configuration link with the opaque secret went out by email
    let secret = ctx
        .latest_secret(&email, TokenPurpose::AccountConfiguration)
        .await;
    assert_eq!(secret.len(), 40);
    assert!(ctx.mailer.sent().last().unwrap().html.contains(&secret));

    // Cannot log in before configuring
    ctx.server
        .post("/auth/login")
        .json(&json!({ "email": &email, "password": test_password() }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Redeeming the link sets the password and verifies the mailbox at once
    let response = ctx
        .server
        .post("/auth/configure-account")
        .json(&json!({
            "token": &secret,
            "password": test_password(),
            "password_confirm": test_password()
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user"]["email_verified"], true);
    assert_eq!(body["user"]["configured"], true);

    ctx.server
        .post("/auth/login")
        .json(&json!({ "email": &email, "password": test_password() }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn approve_guards_cover_every_ineligible_state() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;

    // Salaried target: approval does not apply
    let salaried = corporate_email();
    ctx.register(&salaried, "salaried_or_partner").await;
    ctx.verify_email(&salaried).await;
    let id = ctx.user_id(&salaried).await;
    ctx.server
        .post(&format!("/admin/users/{id}/approve"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);

    // Intern not yet verified
    let intern = test_email();
    ctx.register(&intern, "intern").await;
    let id = ctx.user_id(&intern).await;
    ctx.server
        .post(&format!("/admin/users/{id}/approve"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);

    // Verified intern: approval succeeds once, second attempt is ineligible
    ctx.verify_email(&intern).await;
    ctx.server
        .post(&format!("/admin/users/{id}/approve"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
    ctx.server
        .post(&format!("/admin/users/{id}/approve"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);

    // Unknown target
    ctx.server
        .post("/admin/users/no-such-id/approve")
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approval_survives_mail_delivery_failure() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;

    let intern = test_email();
    ctx.register(&intern, "intern").await;
    ctx.verify_email(&intern).await;
    let id = ctx.user_id(&intern).await;

    ctx.mailer.set_failing(true);
    let response = ctx
        .server
        .post(&format!("/admin/users/{id}/approve"))
        .authorization_bearer(&admin)
        .await;

    // The transition committed; the mail failure is a soft warning
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["mail_warning"].is_string());
    assert!(ctx.user(&intern).await.admin_approved);
}

#[tokio::test]
async fn pending_list_is_the_derived_predicate() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;

    let unverified_intern = test_email();
    ctx.register(&unverified_intern, "intern").await;

    let pending_intern = test_email();
    ctx.register(&pending_intern, "intern").await;
    ctx.verify_email(&pending_intern).await;

    let salaried = corporate_email();
    ctx.register(&salaried, "salaried_or_partner").await;
    ctx.verify_email(&salaried).await;

    let response = ctx
        .server
        .get("/admin/users/pending")
        .authorization_bearer(&admin)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let emails: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();

    assert_eq!(emails, vec![pending_intern.as_str()]);
}

#[tokio::test]
async fn reject_deletes_pending_row_and_its_tokens() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;

    let email = test_email();
    ctx.register(&email, "intern").await;
    let id = ctx.user_id(&email).await;
    let code = ctx
        .latest_secret(&email, TokenPurpose::EmailVerification)
        .await;

    ctx.server
        .delete(&format!("/admin/users/{id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();

    // Row gone, and the outstanding code no longer validates
    assert!(ctx
        .users
        .find_by_email(&email)
        .await
        .unwrap()
        .is_none());
    ctx.server
        .post("/auth/verify-email")
        .json(&json!({ "email": &email, "code": &code }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // The email can register again from scratch
    ctx.register(&email, "intern").await;
}

#[tokio::test]
async fn reject_refuses_fully_active_users() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;

    let email = corporate_email();
    ctx.register(&email, "salaried_or_partner").await;
    ctx.verify_email(&email).await;
    let id = ctx.user_id(&email).await;

    ctx.server
        .delete(&format!("/admin/users/{id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn revoke_and_reactivate_are_guarded_against_no_ops() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;

    let email = corporate_email();
    ctx.register(&email, "salaried_or_partner").await;
    ctx.verify_email(&email).await;
    let id = ctx.user_id(&email).await;

    ctx.server
        .post(&format!("/admin/users/{id}/reactivate"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);

    ctx.server
        .post(&format!("/admin/users/{id}/revoke"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();

    ctx.server
        .post(&format!("/admin/users/{id}/revoke"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn resend_configuration_reissues_link_until_configured() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;
    let email = corporate_email();

    ctx.server
        .post("/admin/users")
        .authorization_bearer(&admin)
        .json(&json!({
            "full_name": "New Hire",
            "email": &email,
            "collaborator_kind": "salaried_or_partner"
        }))
        .await
        .assert_status(StatusCode::CREATED);
    let id = ctx.user_id(&email).await;
    let first = ctx
        .latest_secret(&email, TokenPurpose::AccountConfiguration)
        .await;

    ctx.server
        .post(&format!("/admin/users/{id}/resend-configuration"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
    let second = ctx
        .latest_secret(&email, TokenPurpose::AccountConfiguration)
        .await;
    assert_ne!(first, second);

    // The superseded link is dead
    ctx.server
        .post("/auth/configure-account")
        .json(&json!({
            "token": &first,
            "password": test_password(),
            "password_confirm": test_password()
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // After configuring, resend is no longer eligible
    ctx.server
        .post("/auth/configure-account")
        .json(&json!({
            "token": &second,
            "password": test_password(),
            "password_confirm": test_password()
        }))
        .await
        .assert_status_ok();

    ctx.server
        .post(&format!("/admin/users/{id}/resend-configuration"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn expired_tokens_view_lists_stale_configuration_links() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;
    let email = corporate_email();

    ctx.server
        .post("/admin/users")
        .authorization_bearer(&admin)
        .json(&json!({
            "full_name": "New Hire",
            "email": &email,
            "collaborator_kind": "salaried_or_partner"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    // Fresh link: nothing expired yet
    let response = ctx
        .server
        .get("/admin/tokens/expired")
        .authorization_bearer(&admin)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["tokens"].as_array().unwrap().is_empty());

    // Plant a stale unconsumed link
    ctx.insert_token(
        &email,
        TokenPurpose::AccountConfiguration,
        "staleconfigurationsecretstaleconfigurat",
        -3600,
    )
    .await;

    let response = ctx
        .server
        .get("/admin/tokens/expired")
        .authorization_bearer(&admin)
        .await;
    let body: serde_json::Value = response.json();
    let tokens = body["tokens"].as_array().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0]["user_email"], email.as_str());
}

#[tokio::test]
async fn admin_create_rejects_duplicate_email() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;
    let email = corporate_email();
    ctx.register(&email, "salaried_or_partner").await;

    ctx.server
        .post("/admin/users")
        .authorization_bearer(&admin)
        .json(&json!({
            "full_name": "Duplicate",
            "email": &email,
            "collaborator_kind": "salaried_or_partner"
        }))
        .await
        .assert_status(StatusCode::CONFLICT);
}
