//! The login steps as separate types.
//!
//! Each step is its own struct, and each transition consumes the step it
//! starts from:
//!
//! ```text
//!                  submit_credentials
//! CredentialEntry ───────────────────→ SecondFactorEntry ──submit_second_factor──→ Authenticated
//!       ↑   │                              │        ↑ (wrong code)                    │
//!       │   └────(no second factor)────────┼────────┼────────────────────────────────→│
//!       │                                  │        │                                 │
//!       ├────────── cancel ────────────────┘        │                                 │
//!       └───────────────────────────── logout ──────┴─────────────────────────────────┘
//! ```
//!
//! Because a code can only be submitted from a `SecondFactorEntry`, "send a
//! one-time code before the password" doesn't compile. A failed step hands
//! back the same step with [`LoginError`] attached, so the caller can show
//! the message and try again.

use lapidar_dispatch::TokenKey;
use lapidar_protocol::{LoginRequest, LoginResponse, TotpRequest};

use crate::error::{DEFAULT_INVALID_CODE, DEFAULT_LOGIN_FAILED};
use crate::{AuthBackend, LoginError};

// ---------------------------------------------------------------------------
// CredentialEntry
// ---------------------------------------------------------------------------

/// Waiting for e-mail and password. The initial step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialEntry {
    last_error: Option<LoginError>,
}

/// Where [`CredentialEntry::submit_credentials`] leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsOutcome {
    /// Password accepted; a one-time code is required next.
    SecondFactor(SecondFactorEntry),
    /// Password accepted and no second factor is configured.
    Authenticated(Authenticated),
    /// Still on this step; [`CredentialEntry::error`] says why.
    Rejected(CredentialEntry),
}

impl CredentialEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Why the previous attempt failed, if it did.
    pub fn error(&self) -> Option<&LoginError> {
        self.last_error.as_ref()
    }

    /// Sends e-mail and password to the backend.
    ///
    /// - second factor required → the temporary token is kept in the
    ///   returned [`SecondFactorEntry`] (never in the token store, which
    ///   only ever holds a final credential);
    /// - no second factor → the token is stored as the session credential;
    /// - backend refusal → back to this step with the backend's message, or
    ///   "Ошибка входа" when it gave none;
    /// - no answer → back to this step with "Ошибка сервера: ...".
    pub async fn submit_credentials<B: AuthBackend>(
        self,
        backend: &B,
        email: &str,
        password: &str,
    ) -> CredentialsOutcome {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = match backend.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                let error = LoginError::from_dispatch(&e, DEFAULT_LOGIN_FAILED);
                tracing::info!(%email, error = %e, "login attempt failed");
                return CredentialsOutcome::Rejected(Self::failed(error));
            }
        };

        let Some(token) = accepted_token(&response) else {
            tracing::info!(%email, "credentials rejected");
            return CredentialsOutcome::Rejected(Self::failed(LoginError::rejected(
                response.message(),
                DEFAULT_LOGIN_FAILED,
            )));
        };

        if response.require_2fa {
            tracing::info!(%email, "password accepted, awaiting one-time code");
            return CredentialsOutcome::SecondFactor(SecondFactorEntry {
                email: email.to_string(),
                temp_token: token.to_string(),
                last_error: None,
            });
        }

        CredentialsOutcome::Authenticated(Authenticated::establish(backend, email, token))
    }

    fn failed(error: LoginError) -> Self {
        Self {
            last_error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// SecondFactorEntry
// ---------------------------------------------------------------------------

/// Password accepted; waiting for the one-time code.
///
/// Holds the temporary token from step 1 until the code is accepted or the
/// operator cancels.
#[derive(Clone, PartialEq, Eq)]
pub struct SecondFactorEntry {
    email: String,
    temp_token: String,
    last_error: Option<LoginError>,
}

/// Where [`SecondFactorEntry::submit_second_factor`] leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondFactorOutcome {
    Authenticated(Authenticated),
    /// Still on this step, temporary token retained; see
    /// [`SecondFactorEntry::error`].
    Rejected(SecondFactorEntry),
}

impl SecondFactorEntry {
    /// The e-mail accepted in step 1.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The temporary token issued in step 1.
    pub fn pending_token(&self) -> &str {
        &self.temp_token
    }

    /// Why the previous code was refused, if it was.
    pub fn error(&self) -> Option<&LoginError> {
        self.last_error.as_ref()
    }

    /// Sends the one-time code.
    ///
    /// On success the final credential goes into the token store and the
    /// temporary token is dropped along with this step. On
    /// failure the step comes back unchanged apart from the error, so the
    /// operator can retype the code without re-entering the password.
    pub async fn submit_second_factor<B: AuthBackend>(
        self,
        backend: &B,
        code: &str,
    ) -> SecondFactorOutcome {
        let request = TotpRequest {
            email: self.email.clone(),
            token: self.temp_token.clone(),
            code: code.to_string(),
        };

        let response = match backend.verify_totp(&request).await {
            Ok(response) => response,
            Err(e) => {
                let error = LoginError::from_dispatch(&e, DEFAULT_INVALID_CODE);
                tracing::info!(email = %self.email, error = %e, "one-time code check failed");
                return SecondFactorOutcome::Rejected(self.failed(error));
            }
        };

        match accepted_token(&response) {
            Some(token) => SecondFactorOutcome::Authenticated(Authenticated::establish(
                backend,
                &self.email,
                token,
            )),
            None => {
                tracing::info!(email = %self.email, "one-time code rejected");
                let error = LoginError::rejected(response.message(), DEFAULT_INVALID_CODE);
                SecondFactorOutcome::Rejected(self.failed(error))
            }
        }
    }

    /// Abandons the second step and discards the temporary token.
    pub fn cancel(self) -> CredentialEntry {
        tracing::debug!(email = %self.email, "second factor cancelled");
        CredentialEntry::new()
    }

    fn failed(self, error: LoginError) -> Self {
        Self {
            last_error: Some(error),
            ..self
        }
    }
}

/// Keeps the temporary token out of debug output.
impl std::fmt::Debug for SecondFactorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondFactorEntry")
            .field("email", &self.email)
            .field("temp_token", &"<redacted>")
            .field("last_error", &self.last_error)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Authenticated
// ---------------------------------------------------------------------------

/// Logged in. The session credential is in the token store.
///
/// The only ways to obtain one are a successful login step or
/// [`LoginState::resume`](crate::LoginState::resume) over a store that
/// already holds a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    email: Option<String>,
}

impl Authenticated {
    /// The e-mail that logged in, when this session started in this
    /// process.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Ends the session.
    ///
    /// The backend is told first (the bearer credential must still be
    /// attached to that call); whatever it answers, the token store is
    /// then cleared. A failed notification is logged, never returned.
    pub async fn logout<B: AuthBackend>(self, backend: &B) -> CredentialEntry {
        end_session(backend).await;
        tracing::info!(email = ?self.email, "logged out");
        CredentialEntry::new()
    }

    pub(crate) fn resumed() -> Self {
        Self { email: None }
    }

    fn establish<B: AuthBackend>(backend: &B, email: &str, token: &str) -> Self {
        if let Err(e) = backend.store().set(TokenKey::Session, token) {
            // Memory already holds the credential; only persistence failed.
            tracing::warn!(error = %e, "session credential not persisted");
        }
        tracing::info!(%email, "authenticated");
        Self {
            email: Some(email.to_string()),
        }
    }
}

/// Notifies the backend (if a credential is held) and clears the store.
pub(crate) async fn end_session<B: AuthBackend>(backend: &B) {
    if backend.store().contains(TokenKey::Session) {
        match backend.logout().await {
            Ok(ack) if !ack.is_success() => {
                tracing::warn!(message = ?ack.message(), "backend did not confirm logout");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "logout notification failed, clearing local session anyway");
            }
        }
    }
    if let Err(e) = backend.store().clear() {
        tracing::warn!(error = %e, "cleared session not persisted");
    }
}

/// The token of a successful response, or `None` for a refusal.
///
/// A response claiming success without a token can't be used to log in,
/// so it counts as a refusal.
fn accepted_token(response: &LoginResponse) -> Option<&str> {
    if response.success { response.token() } else { None }
}
