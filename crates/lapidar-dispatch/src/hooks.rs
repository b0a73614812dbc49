//! Request/response hooks applied by the dispatcher.
//!
//! Every outbound call passes through the same ordered list of hooks:
//! [`Hook::before_send`] runs on the request just before it is handed to
//! the transport, [`Hook::after_receive`] runs on every response that came
//! back, *before* its status is looked at.
//!
//! That ordering matters for the anti-forgery token: a 403 can still carry
//! a fresh `X-CSRF-Token`, and the next request must use it.
//!
//! # Shipped hooks
//!
//! [`CsrfRotation`] and [`BearerAuth`] cover the bot backend. Extra hooks
//! are registered through [`DispatcherBuilder::hook`](crate::DispatcherBuilder::hook).

use http::HeaderValue;
use http::header::AUTHORIZATION;
use lapidar_protocol::CSRF_HEADER;
use lapidar_transport::{HttpRequest, HttpResponse};

use crate::{StoreError, TokenKey, TokenStore};

/// A step every request and response passes through.
///
/// # Trait bounds
///
/// - `Send + Sync` → hooks are shared by every clone of the dispatcher,
///   which may be used from several tasks at once.
/// - `'static` → hooks live as long as the dispatcher.
pub trait Hook: Send + Sync + 'static {
    /// Adjusts the outgoing request. Default: no change.
    fn before_send(&self, request: &mut HttpRequest, store: &TokenStore) {
        let _ = (request, store);
    }

    /// Inspects a received response (any status). Default: no change.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if a value taken from the response could
    /// not be persisted.
    fn after_receive(&self, response: &HttpResponse, store: &TokenStore) -> Result<(), StoreError> {
        let _ = (response, store);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CsrfRotation
// ---------------------------------------------------------------------------

/// Attaches and rotates the backend's anti-forgery token.
///
/// - outgoing: a state-changing request gets `X-CSRF-Token` when the store
///   holds one; reads never carry it;
/// - incoming: any response with a non-empty `X-CSRF-Token` replaces the
///   stored token.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfRotation;

impl Hook for CsrfRotation {
    fn before_send(&self, request: &mut HttpRequest, store: &TokenStore) {
        if !request.is_mutating() {
            return;
        }
        let Some(token) = store.get(TokenKey::Csrf) else {
            return;
        };
        match HeaderValue::from_str(&token) {
            Ok(value) => {
                request.headers.insert(CSRF_HEADER, value);
            }
            Err(_) => {
                tracing::warn!(path = %request.path, "stored csrf token is not a valid header value");
            }
        }
    }

    fn after_receive(&self, response: &HttpResponse, store: &TokenStore) -> Result<(), StoreError> {
        let Some(token) = response.header_str(CSRF_HEADER).map(str::trim) else {
            return Ok(());
        };
        if token.is_empty() {
            return Ok(());
        }
        tracing::trace!(status = %response.status, "csrf token rotated");
        store.set(TokenKey::Csrf, token)
    }
}

// ---------------------------------------------------------------------------
// BearerAuth
// ---------------------------------------------------------------------------

/// Sends the stored session credential as `Authorization: Bearer ...`.
///
/// Every request gets it once a credential is held; an explicit
/// `Authorization` header set by the caller is left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerAuth;

impl Hook for BearerAuth {
    fn before_send(&self, request: &mut HttpRequest, store: &TokenStore) {
        if request.headers.contains_key(AUTHORIZATION) {
            return;
        }
        let Some(token) = store.get(TokenKey::Session) else {
            return;
        };
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            request.headers.insert(AUTHORIZATION, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    fn store_with(key: TokenKey, value: &str) -> TokenStore {
        let store = TokenStore::in_memory();
        store.set(key, value).unwrap();
        store
    }

    // =====================================================================
    // CsrfRotation
    // =====================================================================

    #[test]
    fn test_csrf_before_send_mutating_request_gets_header() {
        let store = store_with(TokenKey::Csrf, "c1");
        let mut req = HttpRequest::post("/save-config");
        CsrfRotation.before_send(&mut req, &store);
        assert_eq!(req.headers[CSRF_HEADER], "c1");
    }

    #[test]
    fn test_csrf_before_send_read_has_no_header() {
        let store = store_with(TokenKey::Csrf, "c1");
        let mut req = HttpRequest::get("/config");
        CsrfRotation.before_send(&mut req, &store);
        assert!(req.headers.get(CSRF_HEADER).is_none());
    }

    #[test]
    fn test_csrf_before_send_no_token_no_header() {
        let store = TokenStore::in_memory();
        let mut req = HttpRequest::post("/logout");
        CsrfRotation.before_send(&mut req, &store);
        assert!(req.headers.get(CSRF_HEADER).is_none());
    }

    #[test]
    fn test_csrf_after_receive_rotates_on_error_status() {
        let store = store_with(TokenKey::Csrf, "c1");
        let resp = HttpResponse::new(StatusCode::FORBIDDEN, "bad token")
            .with_header(CSRF_HEADER.parse().unwrap(), HeaderValue::from_static("c2"));
        CsrfRotation.after_receive(&resp, &store).unwrap();
        assert_eq!(store.get(TokenKey::Csrf).as_deref(), Some("c2"));
    }

    #[test]
    fn test_csrf_after_receive_empty_header_keeps_token() {
        let store = store_with(TokenKey::Csrf, "c1");
        let resp = HttpResponse::new(StatusCode::OK, "{}")
            .with_header(CSRF_HEADER.parse().unwrap(), HeaderValue::from_static(""));
        CsrfRotation.after_receive(&resp, &store).unwrap();
        assert_eq!(store.get(TokenKey::Csrf).as_deref(), Some("c1"));
    }

    // =====================================================================
    // BearerAuth
    // =====================================================================

    #[test]
    fn test_bearer_before_send_attaches_credential() {
        let store = store_with(TokenKey::Session, "FINAL");
        let mut req = HttpRequest::get("/config");
        BearerAuth.before_send(&mut req, &store);
        assert_eq!(req.headers[AUTHORIZATION], "Bearer FINAL");
    }

    #[test]
    fn test_bearer_before_send_keeps_explicit_header() {
        let store = store_with(TokenKey::Session, "FINAL");
        let mut req = HttpRequest::post("/logout")
            .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        BearerAuth.before_send(&mut req, &store);
        assert_eq!(req.headers[AUTHORIZATION], "Bearer other");
    }

    #[test]
    fn test_bearer_before_send_without_credential_is_noop() {
        let store = TokenStore::in_memory();
        let mut req = HttpRequest::get("/config");
        BearerAuth.before_send(&mut req, &store);
        assert!(req.headers.get(AUTHORIZATION).is_none());
    }
}
