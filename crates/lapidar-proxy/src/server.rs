//! The front door: an HTTP/1 listener that forwards API calls through the
//! failover manager.
//!
//! # Request handling
//!
//! ```text
//! client ──→ FrontDoor ──(path under /api?)──no──→ 404
//!                │
//!               yes
//!                ▼
//!        buffer body, strip hop-by-hop headers
//!                ▼
//!        FailoverManager::forward ──terminal error──→ 502
//!                ▼
//!        backend response (any status), hop-by-hop headers stripped
//! ```
//!
//! Paths are forwarded unchanged (the backend serves `/api/...` itself).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use lapidar_transport::HttpRequest;
use tokio::net::TcpListener;

use crate::failover::{FailoverManager, HttpUpstream, Upstream};
use crate::{ProxyConfig, ProxyError};

/// State shared by every connection task.
struct DoorState<U> {
    manager: FailoverManager<U>,
    api_prefix: String,
}

/// A bound, not yet running, front door.
pub struct FrontDoor<U> {
    listener: TcpListener,
    state: Arc<DoorState<U>>,
}

impl FrontDoor<HttpUpstream> {
    /// Binds `config.listen` with a real HTTP upstream.
    pub async fn bind(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let upstream = HttpUpstream::new(None)?;
        Self::bind_with(config, upstream).await
    }
}

impl<U: Upstream> FrontDoor<U> {
    /// Binds `config.listen`, forwarding through `upstream`.
    pub async fn bind_with(config: &ProxyConfig, upstream: U) -> Result<Self, ProxyError> {
        let listener = TcpListener::bind(config.listen)
            .await
            .map_err(|source| ProxyError::Bind {
                addr: config.listen,
                source,
            })?;

        let manager = FailoverManager::new(config.candidates(), upstream);
        tracing::info!(
            listen = %listener.local_addr()?,
            primary = %manager.candidates().primary(),
            alternates = manager.candidates().alternates().len(),
            "front door bound"
        );

        Ok(Self {
            listener,
            state: Arc::new(DoorState {
                manager,
                api_prefix: config.api_prefix.clone(),
            }),
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The failover manager behind this door.
    pub fn manager(&self) -> &FailoverManager<U> {
        &self.state.manager
    }

    /// Runs the accept loop. Each connection is served on its own task.
    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), ProxyError> {
        tracing::info!("front door running");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { Ok::<_, Infallible>(handle(&state, req).await) }
                        });
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            tracing::debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn handle<U: Upstream>(state: &DoorState<U>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let path = req.uri().path();
    if !under_prefix(path, &state.api_prefix) {
        return plain(StatusCode::NOT_FOUND, "not found");
    }
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| path.to_string(), |pq| pq.as_str().to_string());

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::debug!(error = %e, "client body unreadable");
            return plain(StatusCode::BAD_REQUEST, "unreadable request body");
        }
    };

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    let request = HttpRequest {
        method: parts.method,
        path: target,
        headers,
        body,
    };

    match state.manager.forward(request).await {
        Ok(upstream) => {
            let mut response = Response::new(Full::new(upstream.body));
            *response.status_mut() = upstream.status;
            let mut headers = upstream.headers;
            strip_hop_by_hop(&mut headers);
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            tracing::warn!(error = %e, "forwarding failed");
            plain(StatusCode::BAD_GATEWAY, &format!("backend unavailable: {e}"))
        }
    }
}

/// `true` for the prefix itself and anything below it (`/api`, `/api/x`),
/// but not for look-alikes (`/apix`).
fn under_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Removes headers that describe one connection rather than the message,
/// plus framing headers (the body is re-framed after buffering).
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Extra hop-by-hop names a peer declared in `Connection`.
    let declared: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    for name in declared {
        headers.remove(name.as_str());
    }

    for name in [
        header::CONNECTION,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
        header::CONTENT_LENGTH,
    ] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

fn plain(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
