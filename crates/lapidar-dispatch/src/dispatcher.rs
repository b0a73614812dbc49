//! The request dispatcher: every call to the backend goes through here.
//!
//! # Request lifecycle
//!
//! ```text
//! caller ──→ encode body ──→ hooks.before_send ──→ transport.send
//!                                                       │
//!            ┌──────── no response ─────────────────────┤
//!            ▼                                          ▼
//!   DispatchError::Transport            hooks.after_receive (any status)
//!                                                       │
//!                                    2xx ──→ decode ──→ caller
//!                                non-2xx ──→ DispatchError::{Unauthorized,
//!                                            Forbidden, Status}
//! ```
//!
//! The dispatcher never retries. Transport failures were already retried
//! by the proxy failover manager (if one sits underneath); application
//! failures are the backend's final word.

use std::fmt;
use std::sync::Arc;

use http::HeaderValue;
use http::header::CONTENT_TYPE;
use lapidar_protocol::{Codec, JsonCodec};
use lapidar_transport::{HttpRequest, HttpResponse, Transport};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{BearerAuth, CsrfRotation, DispatchError, Hook, TokenStore};

/// Sends requests through a [`Transport`], applying the hook chain and
/// normalizing failures.
///
/// Cloning is cheap: the transport, the store, and the hooks are all
/// shared.
pub struct Dispatcher<T> {
    transport: Arc<T>,
    store: TokenStore,
    hooks: Arc<[Box<dyn Hook>]>,
    codec: JsonCodec,
}

impl<T: Transport> Dispatcher<T> {
    /// Creates a dispatcher with the standard hooks: anti-forgery rotation
    /// first, then bearer authentication.
    pub fn new(transport: T, store: TokenStore) -> Self {
        Self::builder(transport, store)
            .hook(CsrfRotation)
            .hook(BearerAuth)
            .build()
    }

    /// Starts a dispatcher with no hooks registered.
    pub fn builder(transport: T, store: TokenStore) -> DispatcherBuilder<T> {
        DispatcherBuilder {
            transport,
            store,
            hooks: Vec::new(),
        }
    }

    /// The store the hooks read from and write to.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a raw request and returns the 2xx response.
    ///
    /// # Errors
    /// - [`DispatchError::Transport`]: no response was received
    /// - [`DispatchError::Unauthorized`], [`DispatchError::Forbidden`],
    ///   [`DispatchError::Status`]: the backend answered non-2xx
    pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, DispatchError> {
        for hook in self.hooks.iter() {
            hook.before_send(&mut request, &self.store);
        }

        let method = request.method.clone();
        let path = request.path.clone();
        tracing::debug!(%method, %path, "dispatching request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%method, %path, error = %e, "no response from backend");
                return Err(DispatchError::Transport(e));
            }
        };

        // Runs before the status check: error responses rotate tokens too.
        for hook in self.hooks.iter() {
            if let Err(e) = hook.after_receive(&response, &self.store) {
                tracing::warn!(error = %e, "token update not persisted");
            }
        }

        if response.is_success() {
            tracing::debug!(%method, %path, status = %response.status, "request succeeded");
            Ok(response)
        } else {
            tracing::debug!(%method, %path, status = %response.status, "backend rejected request");
            Err(DispatchError::from_response(response.status, &response.body))
        }
    }

    /// `GET path` and decodes the JSON body.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, DispatchError> {
        let response = self.send(HttpRequest::get(path)).await?;
        Ok(self.codec.decode(&response.body)?)
    }

    /// `POST path` with `body` encoded as JSON, and decodes the JSON reply.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, DispatchError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let bytes = self.codec.encode(&body)?;
        let request = HttpRequest::post(path)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static(self.codec.content_type()),
            )
            .with_body(bytes);
        let response = self.send(request).await?;
        Ok(self.codec.decode(&response.body)?)
    }

    /// `POST path` with no body, and decodes the JSON reply.
    pub async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R, DispatchError> {
        let response = self.send(HttpRequest::post(path)).await?;
        Ok(self.codec.decode(&response.body)?)
    }
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: self.store.clone(),
            hooks: Arc::clone(&self.hooks),
            codec: self.codec,
        }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store", &self.store)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`Dispatcher`] with a custom hook chain.
///
/// Hooks run in registration order, both before sending and after
/// receiving.
///
/// ```rust
/// use lapidar_dispatch::{CsrfRotation, Dispatcher, TokenStore};
/// use lapidar_transport::{HttpTransport, HttpTransportConfig};
///
/// let transport = HttpTransport::new(HttpTransportConfig::new("http://localhost:3000/api"))?;
/// let dispatcher = Dispatcher::builder(transport, TokenStore::in_memory())
///     .hook(CsrfRotation)
///     .build();
/// # Ok::<(), lapidar_transport::TransportError>(())
/// ```
pub struct DispatcherBuilder<T> {
    transport: T,
    store: TokenStore,
    hooks: Vec<Box<dyn Hook>>,
}

impl<T: Transport> DispatcherBuilder<T> {
    /// Appends a hook to the chain.
    pub fn hook(mut self, hook: impl Hook) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Finishes the dispatcher.
    pub fn build(self) -> Dispatcher<T> {
        Dispatcher {
            transport: Arc::new(self.transport),
            store: self.store,
            hooks: self.hooks.into(),
            codec: JsonCodec,
        }
    }
}
