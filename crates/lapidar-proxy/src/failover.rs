//! The failover manager: keeps requests flowing when the backend's primary
//! port is down.
//!
//! # The ring
//!
//! Candidates are one primary endpoint plus zero or more alternates. The
//! current target is either the primary or one alternate:
//!
//! ```text
//!            connect failure                 connect failure
//! Primary ───────────────────→ Alternate(0) ───────────────→ Alternate(1) ─→ …
//!                                   ↑                                          │
//!                                   └──────────── wraps (never to Primary) ────┘
//! ```
//!
//! Only connection-level failures (refused, unreachable) move the target.
//! An HTTP error status is a response like any other and is passed through.
//!
//! Once on an alternate, the manager stays there until that alternate
//! fails too. The primary is never tried again.
//!
//! # Failure episodes
//!
//! One forwarded request walks the ring until it gets a response or comes
//! back to a target it already tried. Starting on the primary with `n`
//! alternates that is at most `n + 1` attempts; starting on an alternate,
//! at most `n`. Then the caller gets a single
//! [`TransportError::Exhausted`].
//!
//! # Concurrency note
//!
//! The current target is shared by every request through a `Mutex`. The
//! lock is never held across an await. When two requests see the same
//! target fail, only the first one to report it advances the ring; the
//! second finds the target already moved and leaves it alone.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use lapidar_transport::{HttpRequest, HttpResponse, Transport, TransportError, execute};

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// One `{host, port}` the proxy may route to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `http://host:port`, the prefix for every forwarded path.
    pub fn origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The primary endpoint and its ordered alternates.
///
/// Fixed for the life of the manager. Port rules (no duplicates, no
/// alternate equal to the primary) are checked when the configuration is
/// loaded, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    primary: Endpoint,
    alternates: Vec<Endpoint>,
}

impl CandidateList {
    pub fn new(primary: Endpoint, alternates: Vec<Endpoint>) -> Self {
        Self {
            primary,
            alternates,
        }
    }

    /// All candidates on one host.
    pub fn on_host(host: &str, primary_port: u16, alt_ports: &[u16]) -> Self {
        Self::new(
            Endpoint::new(host, primary_port),
            alt_ports.iter().map(|&port| Endpoint::new(host, port)).collect(),
        )
    }

    pub fn primary(&self) -> &Endpoint {
        &self.primary
    }

    pub fn alternates(&self) -> &[Endpoint] {
        &self.alternates
    }

    /// Primary plus alternates.
    pub fn len(&self) -> usize {
        1 + self.alternates.len()
    }

    /// Always `false`: there is always a primary.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The endpoint a target points at.
    ///
    /// An alternate index past the end wraps, so a `Target` from a longer
    /// list still resolves.
    pub fn endpoint(&self, target: Target) -> &Endpoint {
        match target {
            Target::Alternate(i) if !self.alternates.is_empty() => {
                &self.alternates[i % self.alternates.len()]
            }
            _ => &self.primary,
        }
    }
}

// ---------------------------------------------------------------------------
// Target / FailoverState
// ---------------------------------------------------------------------------

/// Where the next request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Primary,
    Alternate(usize),
}

impl Target {
    /// The target after a connection failure on `self`, given how many
    /// alternates exist. `None` when there is nothing to fail over to.
    ///
    /// `Primary → Alternate(0)`, `Alternate(i) → Alternate((i + 1) % n)`.
    /// There is no transition back to `Primary`.
    pub fn after_failure(self, alternates: usize) -> Option<Target> {
        if alternates == 0 {
            return None;
        }
        Some(match self {
            Target::Primary => Target::Alternate(0),
            Target::Alternate(i) => Target::Alternate((i + 1) % alternates),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Primary => f.write_str("primary"),
            Target::Alternate(i) => write!(f, "alternate #{i}"),
        }
    }
}

/// The manager's runtime state: which candidate is current.
///
/// Starts on the primary. Changes only through
/// [`record_failure`](Self::record_failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverState {
    target: Target,
}

impl FailoverState {
    pub fn new() -> Self {
        Self {
            target: Target::Primary,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// `true` once any failover has happened.
    pub fn using_alternate(&self) -> bool {
        matches!(self.target, Target::Alternate(_))
    }

    /// Records that `failed` refused a connection and moves to `next`, but
    /// only if `failed` is still the current target. Returns whether the
    /// state changed.
    pub fn record_failure(&mut self, failed: Target, next: Target) -> bool {
        if self.target != failed {
            return false;
        }
        self.target = next;
        true
    }
}

impl Default for FailoverState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

/// Delivers a request to one specific endpoint.
///
/// This is the seam between the ring logic and the network: the manager
/// decides *where*, the upstream does the sending. Tests plug in an
/// upstream that fails on chosen ports.
pub trait Upstream: Send + Sync + 'static {
    fn send_to(
        &self,
        endpoint: &Endpoint,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// An [`Upstream`] over a shared `reqwest` client.
///
/// Redirects are passed back to the caller rather than followed, and
/// system proxy settings are ignored: the backend is addressed directly.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Builds the client. `timeout` bounds each attempt; `None` waits for
    /// the backend or a connection failure, however long that takes.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Upstream for HttpUpstream {
    async fn send_to(
        &self,
        endpoint: &Endpoint,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", endpoint.origin(), request.path);
        execute(&self.client, &url, request).await
    }
}

// ---------------------------------------------------------------------------
// FailoverManager
// ---------------------------------------------------------------------------

/// Forwards requests to the current candidate, failing over on connection
/// errors.
///
/// Also a [`Transport`], so a dispatcher can sit directly on top of it.
pub struct FailoverManager<U> {
    candidates: CandidateList,
    state: Mutex<FailoverState>,
    upstream: U,
}

impl<U: Upstream> FailoverManager<U> {
    /// Starts on the primary.
    pub fn new(candidates: CandidateList, upstream: U) -> Self {
        Self::with_state(candidates, FailoverState::new(), upstream)
    }

    /// Starts from an explicit state.
    pub fn with_state(candidates: CandidateList, state: FailoverState, upstream: U) -> Self {
        Self {
            candidates,
            state: Mutex::new(state),
            upstream,
        }
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> FailoverState {
        self.lock_state().clone()
    }

    /// The endpoint the next request will go to.
    pub fn current_endpoint(&self) -> &Endpoint {
        self.candidates.endpoint(self.lock_state().target())
    }

    /// Forwards `request`, walking the ring on connection failures.
    ///
    /// A response (any status) is returned as if it came from the first
    /// attempt.
    ///
    /// # Errors
    /// - the upstream's own error if it wasn't a connection failure, or if
    ///   there are no alternates to try
    /// - [`TransportError::Exhausted`] once every reachable candidate in
    ///   this episode refused
    pub async fn forward(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let alternates = self.candidates.alternates.len();
        let mut target = self.lock_state().target();
        let mut tried: Vec<Target> = Vec::with_capacity(self.candidates.len());

        loop {
            let endpoint = self.candidates.endpoint(target);
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                %endpoint,
                %target,
                "forwarding request"
            );

            let err = match self.upstream.send_to(endpoint, request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_connect() => e,
                Err(e) => return Err(e),
            };

            tried.push(target);
            let Some(next) = target.after_failure(alternates) else {
                tracing::warn!(%endpoint, error = %err, "backend unreachable, no alternates configured");
                return Err(err);
            };

            if self.lock_state().record_failure(target, next) {
                tracing::warn!(
                    failed = %endpoint,
                    next = %self.candidates.endpoint(next),
                    "backend unreachable, switching endpoint"
                );
            }

            if tried.contains(&next) {
                tracing::warn!(attempts = tried.len(), "every backend endpoint refused");
                return Err(TransportError::Exhausted {
                    attempts: tried.len(),
                    last: Box::new(err),
                });
            }
            target = next;
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FailoverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<U: Upstream> Transport for FailoverManager<U> {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        self.forward(request)
    }
}

impl<U> fmt::Debug for FailoverManager<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverManager")
            .field("candidates", &self.candidates)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
