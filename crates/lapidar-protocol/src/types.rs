//! Request and response bodies for every backend operation the console
//! uses.
//!
//! Field names follow what the backend actually puts on the wire
//! (`require_2fa`, `memoryUsage`, ...), so some structs rename fields
//! rather than follow one global casing rule.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// API paths
// ---------------------------------------------------------------------------

/// Paths relative to the API root (`/api` behind the front door).
pub mod paths {
    pub const LOGIN: &str = "/login";
    pub const VERIFY_TOTP: &str = "/verify-totp";
    pub const LOGOUT: &str = "/logout";
    pub const CONFIG: &str = "/config";
    pub const SAVE_CONFIG: &str = "/save-config";
    pub const COMMANDS: &str = "/commands";
    pub const UPDATE_COMMAND: &str = "/update-command";
    pub const STATS: &str = "/stats";
    pub const LOGIN_LOGS: &str = "/login-logs";
}

/// Header the backend uses to hand out and check anti-forgery tokens.
pub const CSRF_HEADER: &str = "x-csrf-token";

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Step 1 of the login: e-mail and password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Hand-written so the password never ends up in a log line.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Step 2 of the login: the one-time code, bound to the temporary token
/// issued by step 1.
///
/// The backend checks that the token was issued for `email`, so the
/// identifier from step 1 travels again here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpRequest {
    pub email: String,
    pub token: String,
    pub code: String,
}

impl fmt::Debug for TotpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TotpRequest")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("code", &"<redacted>")
            .finish()
    }
}

/// Answer to both login steps.
///
/// - step 1 success: `token` is a temporary token and `require_2fa` is
///   set, or (no second factor) `token` is already the final credential;
/// - step 2 success: `token` is the final session credential;
/// - failure: `success` is false and `message` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub require_2fa: bool,
}

impl LoginResponse {
    /// The backend's message, if it sent a non-empty one.
    pub fn message(&self) -> Option<&str> {
        non_empty(self.message.as_deref())
    }

    /// The issued token, if it sent a non-empty one.
    pub fn token(&self) -> Option<&str> {
        non_empty(self.token.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Generic acknowledgements
// ---------------------------------------------------------------------------

/// Acknowledgement for write operations.
///
/// Data writes answer `{"status": "success"}`; logout answers
/// `{"success": true, "message": ...}`. One type covers both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    /// Returns `true` when either acknowledgement shape reports success.
    pub fn is_success(&self) -> bool {
        self.success == Some(true) || self.status.as_deref() == Some("success")
    }

    /// The backend's message, if it sent a non-empty one.
    pub fn message(&self) -> Option<&str> {
        non_empty(self.message.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// One bot command as listed by `GET /commands`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub category: String,
    pub enabled: bool,
}

/// Body of `POST /update-command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCommandRequest {
    pub name: String,
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Read-only dashboards
// ---------------------------------------------------------------------------

/// Bot statistics from `GET /stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStats {
    pub servers: u64,
    pub users: u64,
    pub channels: u64,
    pub commands: u64,
    pub uptime: String,
    #[serde(rename = "memoryUsage")]
    pub memory_usage: String,
}

/// One login attempt from `GET /login-logs`.
///
/// `timestamp` is kept as the RFC 3339 text the backend sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginLogEntry {
    #[serde(default)]
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub user_agent: String,
    pub timestamp: String,
    pub success: bool,
    /// Failure reason recorded by the backend; empty for successful logins.
    #[serde(default)]
    pub message: String,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
