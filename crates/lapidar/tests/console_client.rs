//! Integration tests for the console client over a scripted backend.

use std::sync::Arc;

use http::StatusCode;
use http::header::AUTHORIZATION;
use lapidar::prelude::*;
use lapidar::protocol::{ValidationError, paths};
use lapidar_dispatch::testing::ScriptedTransport;
use serde_json::json;

// =========================================================================
// Helpers
// =========================================================================

fn client() -> (ConsoleClient<Arc<ScriptedTransport>>, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new());
    let client = ConsoleClient::new(Dispatcher::new(
        Arc::clone(&transport),
        TokenStore::in_memory(),
    ));
    (client, transport)
}

fn config_json() -> serde_json::Value {
    json!({
        "Token": "bot-token",
        "Prefix": "!",
        "BotName": "Lapidar Bot",
        "DefaultLanguage": "ru",
        "WebInterface": {"Enabled": true, "Host": "localhost", "Port": 8080, "AltPorts": [3000, 8000]},
        "ReportThreshold": 3
    })
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test]
async fn test_save_config_round_trip_keeps_unknown_fields_and_sends_csrf() {
    let (client, backend) = client();
    backend
        .respond_json_with_csrf(StatusCode::OK, config_json(), "c1")
        .respond_json(StatusCode::OK, json!({"status": "success"}));

    let mut config = client.get_config().await.unwrap();
    config.web_interface.add_alt_port(9000).unwrap();
    client.save_config(&config).await.unwrap();

    let sent = backend.last_sent().unwrap();
    assert_eq!(sent.path, paths::SAVE_CONFIG);
    assert_eq!(sent.headers["x-csrf-token"], "c1");
    let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body["ReportThreshold"], 3);
    assert_eq!(body["WebInterface"]["AltPorts"], json!([3000, 8000, 9000]));
}

#[tokio::test]
async fn test_save_config_invalid_ports_sends_nothing() {
    let (client, backend) = client();
    let mut config = BotConfig::default();
    config.web_interface.port = 8080;
    config.web_interface.alt_ports = vec![8000, 8080];

    let err = client.save_config(&config).await.unwrap_err();

    assert!(matches!(
        err,
        LapidarError::Validation(ValidationError::AlternateIsPrimary(8080))
    ));
    assert!(backend.sent().is_empty(), "no network round trip");
}

#[tokio::test]
async fn test_save_config_unconfirmed_write_is_error() {
    let (client, backend) = client();
    backend.respond_json(StatusCode::OK, json!({"status": "error"}));

    let err = client.save_config(&BotConfig::default()).await.unwrap_err();

    assert!(matches!(err, LapidarError::NotAcknowledged { .. }));
    assert_eq!(err.user_message(), "error");
}

// =========================================================================
// Commands and dashboards
// =========================================================================

#[tokio::test]
async fn test_list_commands_decodes_descriptors() {
    let (client, backend) = client();
    backend.respond_json(
        StatusCode::OK,
        json!([
            {"name": "ping", "description": "Проверка", "usage": "!ping", "category": "general", "enabled": true},
            {"name": "ban", "enabled": false}
        ]),
    );

    let commands = client.list_commands().await.unwrap();

    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].name, "ping");
    assert!(!commands[1].enabled);
}

#[tokio::test]
async fn test_update_command_forbidden_surfaces_message() {
    let (client, backend) = client();
    backend.respond_text(StatusCode::FORBIDDEN, "Отсутствует CSRF токен");

    let err = client.update_command("ping", false).await.unwrap_err();

    assert_eq!(err.user_message(), "Отсутствует CSRF токен");
}

#[tokio::test]
async fn test_get_stats_and_login_logs() {
    let (client, backend) = client();
    backend
        .respond_json(
            StatusCode::OK,
            json!({"servers": 15, "users": 1250, "channels": 87, "commands": 42,
                   "uptime": "3 days", "memoryUsage": "128 MB"}),
        )
        .respond_json(
            StatusCode::OK,
            json!([{"email": "a@b.com", "ip": "127.0.0.1", "user_agent": "curl",
                    "timestamp": "2024-05-01T10:00:00Z", "success": true}]),
        );

    let stats = client.get_stats().await.unwrap();
    let logs = client.login_logs().await.unwrap();

    assert_eq!(stats.servers, 15);
    assert_eq!(logs[0].email, "a@b.com");
    assert!(logs[0].success);
}

// =========================================================================
// Login, then data, then logout
// =========================================================================

#[tokio::test]
async fn test_full_session_login_two_factor_then_commands_then_logout() {
    let (client, backend) = client();
    backend
        .respond_json(StatusCode::OK, json!({"success": true, "token": "T1", "require_2fa": true}))
        .respond_json_with_csrf(StatusCode::OK, json!({"success": true, "token": "FINAL"}), "c1")
        .respond_json(StatusCode::OK, json!([]))
        .respond_json(StatusCode::OK, json!({"success": true, "message": "Выход выполнен"}));

    let LoginState::Credentials(step) = client.login_state() else {
        panic!("fresh store must start at credentials");
    };
    let state: LoginState = step
        .submit_credentials(client.dispatcher(), "a@b.com", "right")
        .await
        .into();
    let LoginState::SecondFactor(step) = state else {
        panic!("expected second factor");
    };
    let state: LoginState = step
        .submit_second_factor(client.dispatcher(), "123456")
        .await
        .into();
    assert!(state.is_authenticated());

    client.list_commands().await.unwrap();
    assert_eq!(
        backend.last_sent().unwrap().headers[AUTHORIZATION],
        "Bearer FINAL"
    );

    let state = state.logout(client.dispatcher()).await;
    assert_eq!(state.step(), LoginStep::Credentials);
    assert!(!client.store().contains(TokenKey::Session));
    assert!(!client.store().contains(TokenKey::Csrf));
    assert_eq!(client.login_state().step(), LoginStep::Credentials);
}
