//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{HttpRequest, HttpResponse, Transport, TransportError};

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Root every request path is appended to, e.g.
    /// `http://localhost:3000/api`.
    pub base_url: String,

    /// Per-request timeout. `None` waits until the server answers or the
    /// connection fails.
    pub timeout: Option<Duration>,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY`. Off by default: the console
    /// addresses its front door directly.
    pub system_proxy: bool,
}

impl HttpTransportConfig {
    /// Creates a config with no timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            system_proxy: false,
        }
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Routes requests through the system proxy settings.
    pub fn with_system_proxy(mut self) -> Self {
        self.system_proxy = true;
        self
    }
}

/// A [`Transport`] that sends requests to a fixed base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport for the given config.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let base_url = normalize_base_url(&config.base_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        tracing::debug!(%base_url, "http transport ready");
        Ok(Self { base_url, client })
    }

    /// Returns the normalized base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        execute(&self.client, &url, request).await
    }
}

/// Sends `request` to the absolute `url` and buffers the response.
///
/// `request.path` is ignored; callers have already folded it into `url`.
/// Shared by [`HttpTransport`] and the proxy's upstream so both classify
/// failures the same way.
pub async fn execute(
    client: &reqwest::Client,
    url: &str,
    request: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let HttpRequest {
        method,
        headers,
        body,
        ..
    } = request;

    let response = client
        .request(method, url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| classify(url, e))?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(|e| classify(url, e))?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn classify(target: &str, err: reqwest::Error) -> TransportError {
    let target = target.to_string();
    if err.is_connect() {
        TransportError::Connect {
            target,
            reason: err.to_string(),
        }
    } else if err.is_timeout() {
        TransportError::Timeout { target }
    } else {
        TransportError::Request {
            target,
            reason: err.to_string(),
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, TransportError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return Err(TransportError::InvalidBaseUrl(raw.to_string()));
    };
    if !matches!(scheme, "http" | "https") || rest.is_empty() || rest.starts_with('/') {
        return Err(TransportError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:3000/api/").unwrap(),
            "http://localhost:3000/api"
        );
    }

    #[test]
    fn test_normalize_base_url_rejects_missing_scheme() {
        assert!(matches!(
            normalize_base_url("localhost:3000"),
            Err(TransportError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_normalize_base_url_rejects_empty_host() {
        assert!(normalize_base_url("http://").is_err());
        assert!(normalize_base_url("ftp://host").is_err());
    }

    #[test]
    fn test_new_keeps_normalized_base_url() {
        let transport =
            HttpTransport::new(HttpTransportConfig::new(" http://127.0.0.1:9/api/ "))
                .unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:9/api");
    }
}
