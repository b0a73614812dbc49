//! Transport abstraction layer for the Lapidar console.
//!
//! Provides the [`HttpRequest`]/[`HttpResponse`] exchange types and the
//! [`Transport`] trait that every outbound call goes through. The request
//! dispatcher sits on top of a `Transport`; the proxy failover manager is
//! itself a `Transport`, so the two compose without either knowing the
//! other.
//!
//! # Feature Flags
//!
//! - `reqwest-client` (default): [`HttpTransport`] backed by `reqwest`

mod error;
#[cfg(feature = "reqwest-client")]
mod client;

pub use error::TransportError;
#[cfg(feature = "reqwest-client")]
pub use client::{HttpTransport, HttpTransportConfig, execute};

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};

/// A fully buffered outbound request.
///
/// `path` is relative to whatever root the transport targets (the API
/// root for the console, the endpoint origin for the proxy) and keeps its
/// query string.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds (or replaces) a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns `true` unless the method is a pure read.
    ///
    /// `GET`, `HEAD` and `OPTIONS` never change server state; everything
    /// else does.
    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a response with no headers.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds (or replaces) a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the header value as text, if present and valid UTF-8.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Sends requests somewhere and returns whatever came back.
///
/// A non-2xx status is still `Ok` here: the transport only fails when no
/// response was received at all. Interpreting statuses is the
/// dispatcher's job.
///
/// The returned future must be `Send` so transports can be driven from
/// spawned tasks (the proxy front door serves every connection on its own
/// task).
pub trait Transport: Send + Sync + 'static {
    /// Sends one request and waits for its response.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).send(request)
    }
}
