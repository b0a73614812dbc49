//! A scripted in-memory [`Transport`] for tests.
//!
//! Queue the responses (or failures) the "backend" should produce, run the
//! code under test, then look at what it sent.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use http::{HeaderName, HeaderValue, StatusCode};
use lapidar_protocol::CSRF_HEADER;
use lapidar_transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Replays queued outcomes in order and records every request it receives.
///
/// When the queue runs dry, `send` fails with a connection error, so a test
/// that makes one call too many fails loudly instead of hanging.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with a JSON body.
    pub fn respond_json(&self, status: StatusCode, body: serde_json::Value) -> &Self {
        self.push(Ok(HttpResponse::new(status, body.to_string())))
    }

    /// Queues a response with a JSON body and a rotated anti-forgery token.
    pub fn respond_json_with_csrf(
        &self,
        status: StatusCode,
        body: serde_json::Value,
        csrf: &'static str,
    ) -> &Self {
        let response = HttpResponse::new(status, body.to_string()).with_header(
            HeaderName::from_static(CSRF_HEADER),
            HeaderValue::from_static(csrf),
        );
        self.push(Ok(response))
    }

    /// Queues a response with a plain-text body.
    pub fn respond_text(&self, status: StatusCode, body: &str) -> &Self {
        self.push(Ok(HttpResponse::new(status, body.to_string())))
    }

    /// Queues a connection failure.
    pub fn fail_connect(&self) -> &Self {
        self.push(Err(TransportError::Connect {
            target: "scripted".into(),
            reason: "connection refused".into(),
        }))
    }

    /// Queues an arbitrary outcome.
    pub fn push(&self, outcome: Result<HttpResponse, TransportError>) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
        self
    }

    /// Every request received so far, in order.
    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent request, if any.
    pub fn last_sent(&self) -> Option<HttpRequest> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Outcomes still queued.
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Connect {
                    target: "scripted".into(),
                    reason: "script exhausted".into(),
                })
            })
    }
}
