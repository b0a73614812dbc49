//! [`LoginState`]: the three steps behind one type, for callers that keep
//! "the current login screen" in a single field.

use lapidar_dispatch::{TokenKey, TokenStore};

use crate::flow::end_session;
use crate::{
    AuthBackend, Authenticated, CredentialEntry, CredentialsOutcome, LoginError,
    SecondFactorEntry, SecondFactorOutcome,
};

/// Which step a [`LoginState`] is on, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    Credentials,
    SecondFactor,
    Authenticated,
}

/// The login flow as a single value.
///
/// Transitions are still only reachable through the step types: match on
/// the variant, call the transition, convert the outcome back with `into()`.
///
/// ```rust,no_run
/// # async fn demo<B: lapidar_session::AuthBackend>(backend: &B) {
/// use lapidar_session::LoginState;
///
/// let state = LoginState::resume(backend.store());
/// let state: LoginState = match state {
///     LoginState::Credentials(step) => {
///         step.submit_credentials(backend, "admin@example.com", "secret").await.into()
///     }
///     other => other,
/// };
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Credentials(CredentialEntry),
    SecondFactor(SecondFactorEntry),
    Authenticated(Authenticated),
}

impl LoginState {
    /// A fresh flow at the credentials step.
    pub fn new() -> Self {
        Self::Credentials(CredentialEntry::new())
    }

    /// Starts where the previous run left off: authenticated if the store
    /// still holds a session credential, otherwise at the credentials step.
    pub fn resume(store: &TokenStore) -> Self {
        if store.contains(TokenKey::Session) {
            tracing::debug!("resuming stored session");
            Self::Authenticated(Authenticated::resumed())
        } else {
            Self::new()
        }
    }

    pub fn step(&self) -> LoginStep {
        match self {
            Self::Credentials(_) => LoginStep::Credentials,
            Self::SecondFactor(_) => LoginStep::SecondFactor,
            Self::Authenticated(_) => LoginStep::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The error from the last failed step, if the flow is sitting on one.
    pub fn error(&self) -> Option<&LoginError> {
        match self {
            Self::Credentials(step) => step.error(),
            Self::SecondFactor(step) => step.error(),
            Self::Authenticated(_) => None,
        }
    }

    /// Logs out from whatever step the flow is on.
    ///
    /// From `Authenticated` this is [`Authenticated::logout`]. From the
    /// other steps no session credential should exist, but the store is
    /// cleared anyway and any temporary token is dropped.
    pub async fn logout<B: AuthBackend>(self, backend: &B) -> Self {
        match self {
            Self::Authenticated(session) => Self::Credentials(session.logout(backend).await),
            Self::Credentials(_) | Self::SecondFactor(_) => {
                end_session(backend).await;
                Self::new()
            }
        }
    }
}

impl Default for LoginState {
    fn default() -> Self {
        Self::new()
    }
}

impl From<CredentialsOutcome> for LoginState {
    fn from(outcome: CredentialsOutcome) -> Self {
        match outcome {
            CredentialsOutcome::SecondFactor(step) => Self::SecondFactor(step),
            CredentialsOutcome::Authenticated(step) => Self::Authenticated(step),
            CredentialsOutcome::Rejected(step) => Self::Credentials(step),
        }
    }
}

impl From<SecondFactorOutcome> for LoginState {
    fn from(outcome: SecondFactorOutcome) -> Self {
        match outcome {
            SecondFactorOutcome::Authenticated(step) => Self::Authenticated(step),
            SecondFactorOutcome::Rejected(step) => Self::SecondFactor(step),
        }
    }
}

impl From<CredentialEntry> for LoginState {
    fn from(step: CredentialEntry) -> Self {
        Self::Credentials(step)
    }
}
