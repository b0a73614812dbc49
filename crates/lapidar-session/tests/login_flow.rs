//! The login state machine against a scripted backend.

use std::sync::Arc;

use http::StatusCode;
use http::header::AUTHORIZATION;
use lapidar_dispatch::testing::ScriptedTransport;
use lapidar_dispatch::{Dispatcher, TokenKey, TokenStore};
use lapidar_protocol::paths;
use lapidar_session::{
    CredentialEntry, CredentialsOutcome, LoginError, LoginState, LoginStep, SecondFactorEntry,
    SecondFactorOutcome,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Backend = Dispatcher<Arc<ScriptedTransport>>;

fn backend() -> (Backend, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new());
    let dispatcher = Dispatcher::new(Arc::clone(&transport), TokenStore::in_memory());
    (dispatcher, transport)
}

/// Runs step 1 with a backend that demands a second factor and issues `T1`.
async fn at_second_factor(backend: &Backend, transport: &ScriptedTransport) -> SecondFactorEntry {
    transport.respond_json(
        StatusCode::OK,
        json!({"success": true, "message": "", "token": "T1", "require_2fa": true}),
    );
    match CredentialEntry::new()
        .submit_credentials(backend, "a@b.com", "right")
        .await
    {
        CredentialsOutcome::SecondFactor(step) => step,
        other => panic!("expected second factor, got {other:?}"),
    }
}

fn body_json(transport: &ScriptedTransport) -> serde_json::Value {
    serde_json::from_slice(&transport.last_sent().unwrap().body).unwrap()
}

// ---------------------------------------------------------------------------
// Credentials step
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_submit_credentials_wrong_password_stays_with_backend_message() {
    let (backend, transport) = backend();
    transport.respond_json(
        StatusCode::OK,
        json!({"success": false, "message": "Ошибка входа"}),
    );

    let outcome = CredentialEntry::new()
        .submit_credentials(&backend, "a@b.com", "wrong")
        .await;

    let CredentialsOutcome::Rejected(step) = outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert_eq!(step.error().unwrap().to_string(), "Ошибка входа");
    assert!(!backend.store().contains(TokenKey::Session));
}

#[tokio::test]
async fn test_submit_credentials_unauthorized_status_surfaces_backend_message() {
    let (backend, transport) = backend();
    transport.respond_json(
        StatusCode::UNAUTHORIZED,
        json!({"success": false, "message": "Неверный email или пароль"}),
    );

    let state: LoginState = CredentialEntry::new()
        .submit_credentials(&backend, "a@b.com", "wrong")
        .await
        .into();

    assert_eq!(state.step(), LoginStep::Credentials);
    assert_eq!(
        state.error(),
        Some(&LoginError::Rejected {
            message: "Неверный email или пароль".into()
        })
    );
}

#[tokio::test]
async fn test_submit_credentials_rejection_without_message_uses_default() {
    let (backend, transport) = backend();
    transport.respond_json(StatusCode::OK, json!({"success": false}));

    let state: LoginState = CredentialEntry::new()
        .submit_credentials(&backend, "a@b.com", "wrong")
        .await
        .into();

    assert_eq!(state.error().unwrap().to_string(), "Ошибка входа");
}

#[tokio::test]
async fn test_submit_credentials_unauthorized_without_message_uses_default() {
    let (backend, transport) = backend();
    transport.respond_json(StatusCode::UNAUTHORIZED, json!({"success": false}));

    let state: LoginState = CredentialEntry::new()
        .submit_credentials(&backend, "a@b.com", "wrong")
        .await
        .into();

    assert_eq!(state.step(), LoginStep::Credentials);
    assert_eq!(
        state.error(),
        Some(&LoginError::Rejected {
            message: "Ошибка входа".into()
        })
    );
}

#[tokio::test]
async fn test_submit_credentials_unreachable_backend_is_server_error() {
    let (backend, transport) = backend();
    transport.fail_connect();

    let state: LoginState = CredentialEntry::new()
        .submit_credentials(&backend, "a@b.com", "right")
        .await
        .into();

    assert_eq!(state.step(), LoginStep::Credentials);
    let error = state.error().unwrap();
    assert!(error.is_unreachable());
    assert!(error.to_string().starts_with("Ошибка сервера: "));
}

#[tokio::test]
async fn test_submit_credentials_requires_second_factor_keeps_temp_token_out_of_store() {
    let (backend, transport) = backend();

    let step = at_second_factor(&backend, &transport).await;

    assert_eq!(step.pending_token(), "T1");
    assert_eq!(step.email(), "a@b.com");
    assert!(step.error().is_none());
    assert!(!backend.store().contains(TokenKey::Session));
    assert_eq!(
        body_json(&transport),
        json!({"email": "a@b.com", "password": "right"})
    );
}

#[tokio::test]
async fn test_submit_credentials_without_second_factor_stores_credential() {
    let (backend, transport) = backend();
    transport.respond_json(
        StatusCode::OK,
        json!({"success": true, "token": "FINAL", "require_2fa": false}),
    );

    let outcome = CredentialEntry::new()
        .submit_credentials(&backend, "a@b.com", "right")
        .await;

    let CredentialsOutcome::Authenticated(session) = outcome else {
        panic!("expected authenticated, got {outcome:?}");
    };
    assert_eq!(session.email(), Some("a@b.com"));
    assert_eq!(backend.store().get(TokenKey::Session).as_deref(), Some("FINAL"));
}

#[tokio::test]
async fn test_submit_credentials_success_without_token_is_rejection() {
    let (backend, transport) = backend();
    transport.respond_json(StatusCode::OK, json!({"success": true}));

    let outcome = CredentialEntry::new()
        .submit_credentials(&backend, "a@b.com", "right")
        .await;

    assert!(matches!(outcome, CredentialsOutcome::Rejected(_)));
    assert!(!backend.store().contains(TokenKey::Session));
}

// ---------------------------------------------------------------------------
// Second-factor step
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_submit_second_factor_wrong_code_retains_temp_token() {
    let (backend, transport) = backend();
    let step = at_second_factor(&backend, &transport).await;
    transport.respond_json(
        StatusCode::OK,
        json!({"success": false, "message": "Неверный код"}),
    );

    let outcome = step.submit_second_factor(&backend, "000000").await;

    let SecondFactorOutcome::Rejected(step) = outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert_eq!(step.pending_token(), "T1");
    assert_eq!(step.error().unwrap().to_string(), "Неверный код");
    assert!(!backend.store().contains(TokenKey::Session));
}

#[tokio::test]
async fn test_submit_second_factor_retry_after_wrong_code_succeeds() {
    let (backend, transport) = backend();
    let step = at_second_factor(&backend, &transport).await;
    transport
        .respond_json(StatusCode::UNAUTHORIZED, json!({"success": false}))
        .respond_json(StatusCode::OK, json!({"success": true, "token": "FINAL"}));

    let SecondFactorOutcome::Rejected(step) = step.submit_second_factor(&backend, "000000").await
    else {
        panic!("first code should be refused");
    };
    assert_eq!(step.error().unwrap().to_string(), "Неверный код");
    let outcome = step.submit_second_factor(&backend, "123456").await;

    assert!(matches!(outcome, SecondFactorOutcome::Authenticated(_)));
    assert_eq!(
        body_json(&transport),
        json!({"email": "a@b.com", "token": "T1", "code": "123456"})
    );
}

#[tokio::test]
async fn test_submit_second_factor_correct_code_stores_final_credential() {
    let (backend, transport) = backend();
    let step = at_second_factor(&backend, &transport).await;
    transport.respond_json(StatusCode::OK, json!({"success": true, "token": "FINAL"}));

    let state: LoginState = step.submit_second_factor(&backend, "123456").await.into();

    assert!(state.is_authenticated());
    assert_eq!(backend.store().get(TokenKey::Session).as_deref(), Some("FINAL"));
    assert_eq!(transport.last_sent().unwrap().path, paths::VERIFY_TOTP);
}

#[tokio::test]
async fn test_submit_second_factor_rejection_without_message_uses_default() {
    let (backend, transport) = backend();
    let step = at_second_factor(&backend, &transport).await;
    transport.respond_json(StatusCode::OK, json!({"success": false, "message": ""}));

    let state: LoginState = step.submit_second_factor(&backend, "000000").await.into();

    assert_eq!(state.step(), LoginStep::SecondFactor);
    assert_eq!(state.error().unwrap().to_string(), "Неверный код");
}

#[tokio::test]
async fn test_submit_second_factor_unauthorized_without_message_uses_default() {
    let (backend, transport) = backend();
    let step = at_second_factor(&backend, &transport).await;
    transport.respond_text(StatusCode::UNAUTHORIZED, "");

    let outcome = step.submit_second_factor(&backend, "000000").await;

    let SecondFactorOutcome::Rejected(step) = outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert_eq!(step.pending_token(), "T1");
    assert_eq!(step.error().unwrap().to_string(), "Неверный код");
}

#[tokio::test]
async fn test_cancel_second_factor_returns_to_credentials() {
    let (backend, transport) = backend();
    let step = at_second_factor(&backend, &transport).await;

    let state: LoginState = step.cancel().into();

    assert_eq!(state.step(), LoginStep::Credentials);
    assert!(state.error().is_none());
    assert!(!backend.store().contains(TokenKey::Session));
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

async fn authenticated(backend: &Backend, transport: &ScriptedTransport) -> LoginState {
    transport.respond_json(StatusCode::OK, json!({"success": true, "token": "FINAL"}));
    backend.store().set(TokenKey::Csrf, "c1").unwrap();
    CredentialEntry::new()
        .submit_credentials(backend, "a@b.com", "right")
        .await
        .into()
}

#[tokio::test]
async fn test_logout_notifies_backend_with_credentials_then_clears_store() {
    let (backend, transport) = backend();
    let state = authenticated(&backend, &transport).await;
    transport.respond_json(StatusCode::OK, json!({"success": true, "message": "bye"}));

    let state = state.logout(&backend).await;

    assert_eq!(state.step(), LoginStep::Credentials);
    let sent = transport.last_sent().unwrap();
    assert_eq!(sent.path, paths::LOGOUT);
    assert_eq!(sent.headers[AUTHORIZATION], "Bearer FINAL");
    assert_eq!(sent.headers["x-csrf-token"], "c1");
    assert!(!backend.store().contains(TokenKey::Session));
    assert!(!backend.store().contains(TokenKey::Csrf));
}

#[tokio::test]
async fn test_logout_backend_unreachable_still_clears_store() {
    let (backend, transport) = backend();
    let state = authenticated(&backend, &transport).await;
    transport.fail_connect();

    let state = state.logout(&backend).await;

    assert_eq!(state.step(), LoginStep::Credentials);
    assert!(!backend.store().contains(TokenKey::Session));
    assert!(!backend.store().contains(TokenKey::Csrf));
}

#[tokio::test]
async fn test_logout_backend_error_status_still_clears_store() {
    let (backend, transport) = backend();
    let state = authenticated(&backend, &transport).await;
    transport.respond_text(StatusCode::FORBIDDEN, "Невалидный CSRF токен");

    let state = state.logout(&backend).await;

    assert!(!state.is_authenticated());
    assert!(!backend.store().contains(TokenKey::Session));
}

#[tokio::test]
async fn test_logout_from_second_factor_skips_backend_and_drops_temp_token() {
    let (backend, transport) = backend();
    let step = at_second_factor(&backend, &transport).await;
    let sent_before = transport.sent().len();

    let state = LoginState::SecondFactor(step).logout(&backend).await;

    assert_eq!(state.step(), LoginStep::Credentials);
    assert_eq!(transport.sent().len(), sent_before, "no credential, no notification");
}

#[tokio::test]
async fn test_resume_after_login_with_persisted_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let transport = Arc::new(ScriptedTransport::new());
    let backend = Dispatcher::new(Arc::clone(&transport), TokenStore::open(&path).unwrap());
    transport.respond_json(StatusCode::OK, json!({"success": true, "token": "FINAL"}));
    let _ = CredentialEntry::new()
        .submit_credentials(&backend, "a@b.com", "right")
        .await;

    let reopened = TokenStore::open(&path).unwrap();
    assert!(LoginState::resume(&reopened).is_authenticated());
}
