use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use intranet_accounts::modules::accounts::interface::{AccountError, TokenRepository};
use intranet_accounts::modules::accounts::memory::MemoryTokenRepo;
use intranet_accounts::modules::accounts::model::{AccountToken, TokenPurpose};
use intranet_accounts::modules::accounts::tokens::TokenIssuer;

fn issuer() -> (TokenIssuer, Arc<MemoryTokenRepo>) {
    let repo = Arc::new(MemoryTokenRepo::new());
    (TokenIssuer::new(repo.clone()), repo)
}

#[tokio::test]
async fn issue_then_validate_returns_owner() {
    let (issuer, _) = issuer();

    let issued = issuer
        .issue("user-1", TokenPurpose::EmailVerification)
        .await
        .unwrap();
    assert!(issued.expires_at > Utc::now());

    let owner = issuer
        .validate(&issued.secret, TokenPurpose::EmailVerification)
        .await
        .unwrap();
    assert_eq!(owner, "user-1");
}

#[tokio::test]
async fn validate_does_not_consume() {
    let (issuer, _) = issuer();
    let issued = issuer
        .issue("user-1", TokenPurpose::PasswordReset)
        .await
        .unwrap();

    for _ in 0..3 {
        issuer
            .validate(&issued.secret, TokenPurpose::PasswordReset)
            .await
            .unwrap();
    }
    issuer
        .consume(&issued.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap();
}

#[tokio::test]
async fn secrets_are_scoped_to_their_purpose() {
    let (issuer, _) = issuer();
    let issued = issuer
        .issue("user-1", TokenPurpose::EmailVerification)
        .await
        .unwrap();

    let result = issuer
        .validate(&issued.secret, TokenPurpose::PasswordReset)
        .await;
    assert!(matches!(result, Err(AccountError::TokenNotFound)));
}

#[tokio::test]
async fn issuing_again_invalidates_the_previous_token() {
    let (issuer, _) = issuer();

    let first = issuer
        .issue("user-1", TokenPurpose::AccountConfiguration)
        .await
        .unwrap();
    let second = issuer
        .issue("user-1", TokenPurpose::AccountConfiguration)
        .await
        .unwrap();
    assert_ne!(first.secret, second.secret);

    let stale = issuer
        .validate(&first.secret, TokenPurpose::AccountConfiguration)
        .await;
    assert!(matches!(stale, Err(AccountError::TokenAlreadyUsed)));

    issuer
        .validate(&second.secret, TokenPurpose::AccountConfiguration)
        .await
        .unwrap();
}

#[tokio::test]
async fn supersede_is_scoped_to_one_user() {
    let (issuer, _) = issuer();

    let other = issuer
        .issue("user-2", TokenPurpose::EmailVerification)
        .await
        .unwrap();
    issuer
        .issue("user-1", TokenPurpose::EmailVerification)
        .await
        .unwrap();

    // user-2's token is untouched
    issuer
        .validate(&other.secret, TokenPurpose::EmailVerification)
        .await
        .unwrap();
}

#[tokio::test]
async fn expired_token_fails_even_if_never_consumed() {
    let (issuer, repo) = issuer();

    let now = Utc::now();
    repo.create(&AccountToken {
        id: Uuid::new_v4().to_string(),
        user_id: "user-1".to_string(),
        purpose: TokenPurpose::PasswordReset,
        secret: "161803".to_string(),
        issued_at: now - Duration::hours(1),
        expires_at: now - Duration::minutes(30),
        consumed: false,
    })
    .await
    .unwrap();

    let validated = issuer.validate("161803", TokenPurpose::PasswordReset).await;
    assert!(matches!(validated, Err(AccountError::TokenExpired)));

    let consumed = issuer.consume("161803", TokenPurpose::PasswordReset).await;
    assert!(matches!(consumed, Err(AccountError::TokenExpired)));
}

#[tokio::test]
async fn concurrent_consume_lets_exactly_one_through() {
    let (issuer, _) = issuer();
    let issued = issuer
        .issue("user-1", TokenPurpose::EmailVerification)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        issuer.consume(&issued.secret, TokenPurpose::EmailVerification),
        issuer.consume(&issued.secret, TokenPurpose::EmailVerification),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(AccountError::TokenAlreadyUsed)));
}

#[tokio::test]
async fn consumed_token_reports_already_used() {
    let (issuer, _) = issuer();
    let issued = issuer
        .issue("user-1", TokenPurpose::EmailVerification)
        .await
        .unwrap();

    issuer
        .consume(&issued.secret, TokenPurpose::EmailVerification)
        .await
        .unwrap();

    let again = issuer
        .consume(&issued.secret, TokenPurpose::EmailVerification)
        .await;
    assert!(matches!(again, Err(AccountError::TokenAlreadyUsed)));
}
