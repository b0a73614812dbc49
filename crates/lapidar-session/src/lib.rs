//! Two-step login for the Lapidar console.
//!
//! This crate takes an operator from "not logged in" to "holding a session
//! credential":
//!
//! 1. **Credentials**: e-mail and password ([`CredentialEntry`])
//! 2. **Second factor**: a one-time code, when the account requires one
//!    ([`SecondFactorEntry`])
//! 3. **Authenticated**: the final credential is in the token store
//!    ([`Authenticated`]), until logout
//!
//! Each step is a separate type and transitions consume the step they
//! start from, so an out-of-order call is a compile error rather than a
//! runtime check. [`LoginState`] wraps the three for callers that need one
//! value.
//!
//! # How it fits in the stack
//!
//! ```text
//! UI / demo (above)            ← shows the step and its error message
//!     ↕
//! Session Layer (this crate)   ← which step, what to send, what to store
//!     ↕
//! Dispatch Layer (below)       ← AuthBackend calls, TokenStore
//! ```

mod auth;
mod error;
mod flow;
mod state;

pub use auth::AuthBackend;
pub use error::{DEFAULT_INVALID_CODE, DEFAULT_LOGIN_FAILED, LoginError, SERVER_ERROR_PREFIX};
pub use flow::{
    Authenticated, CredentialEntry, CredentialsOutcome, SecondFactorEntry, SecondFactorOutcome,
};
pub use state::{LoginState, LoginStep};
