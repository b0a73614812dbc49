//! The backend calls the login flow needs.
//!
//! The state machine doesn't build HTTP requests itself. It talks to an
//! [`AuthBackend`]: three async calls plus access to the token store they
//! write into. [`Dispatcher`] implements it against the real backend; a
//! test can drive the same machine through a dispatcher over a scripted
//! transport.

use std::future::Future;

use lapidar_dispatch::{DispatchError, Dispatcher, TokenStore};
use lapidar_protocol::{
    LoginRequest, LoginResponse, StatusResponse, TotpRequest, paths,
};
use lapidar_transport::Transport;

/// The authentication endpoints of the backend.
///
/// # Trait bounds
///
/// - `Send + Sync` → one backend is shared by the login flow and every
///   other component that reads the session credential.
/// - `'static` → it lives as long as the console.
pub trait AuthBackend: Send + Sync + 'static {
    /// Step 1: e-mail and password.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<LoginResponse, DispatchError>> + Send;

    /// Step 2: the one-time code bound to the temporary token.
    fn verify_totp(
        &self,
        request: &TotpRequest,
    ) -> impl Future<Output = Result<LoginResponse, DispatchError>> + Send;

    /// Tells the backend the session is over.
    fn logout(&self) -> impl Future<Output = Result<StatusResponse, DispatchError>> + Send;

    /// Where the final session credential lives.
    fn store(&self) -> &TokenStore;
}

impl<T: Transport> AuthBackend for Dispatcher<T> {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, DispatchError> {
        self.post_json(paths::LOGIN, request).await
    }

    async fn verify_totp(&self, request: &TotpRequest) -> Result<LoginResponse, DispatchError> {
        self.post_json(paths::VERIFY_TOTP, request).await
    }

    async fn logout(&self) -> Result<StatusResponse, DispatchError> {
        self.post_empty(paths::LOGOUT).await
    }

    fn store(&self) -> &TokenStore {
        Dispatcher::store(self)
    }
}
