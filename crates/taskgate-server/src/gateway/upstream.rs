//! HTTP client capability for the two backend services.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{Method, StatusCode, header};
use bytes::Bytes;
use thiserror::Error;

use crate::config::UpstreamConfig;

/// The two services the gateway fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Auth,
    Todo,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Todo => write!(f, "todo"),
        }
    }
}

/// Errors from a forwarded request that produced no backend response.
///
/// Anything the backend did answer, including 4xx and 5xx statuses, is not
/// an error here; those responses pass through verbatim.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} backend timed out after {timeout_secs}s")]
    Timeout { service: Upstream, timeout_secs: u64 },

    #[error("failed to connect to {service} backend: {source}")]
    Connect {
        service: Upstream,
        source: reqwest::Error,
    },

    #[error("request to {service} backend failed: {source}")]
    Request {
        service: Upstream,
        source: reqwest::Error,
    },
}

/// Response received from a backend, passed through unmodified.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Capability for issuing a request to a named backend service.
///
/// The caller's bearer credential is forwarded unchanged when present and
/// never fabricated. Shared by all in-flight requests.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn forward(
        &self,
        service: Upstream,
        method: Method,
        path_and_query: &str,
        bearer: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<UpstreamResponse, UpstreamError>;
}

/// Upstream client over a shared `reqwest` connection pool.
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    auth_base: String,
    todo_base: String,
    timeout_secs: u64,
}

impl HttpUpstreamClient {
    /// Builds the client with the configured request timeout. The pool is
    /// created once per process and reused across requests.
    pub fn new(config: &UpstreamConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            auth_base: config.auth_url.trim_end_matches('/').to_string(),
            todo_base: config.todo_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn base_for(&self, service: Upstream) -> &str {
        match service {
            Upstream::Auth => &self.auth_base,
            Upstream::Todo => &self.todo_base,
        }
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn forward(
        &self,
        service: Upstream,
        method: Method,
        path_and_query: &str,
        bearer: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_for(service), path_and_query);
        tracing::debug!(service = %service, method = %method, url = %url, "forwarding request");

        let mut request = self.client.request(method, &url);
        if let Some(value) = bearer {
            request = request.header(header::AUTHORIZATION, value);
        }
        if let Some(bytes) = body {
            request = request.body(bytes);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout {
                    service,
                    timeout_secs: self.timeout_secs,
                }
            } else if e.is_connect() {
                UpstreamError::Connect { service, source: e }
            } else {
                UpstreamError::Request { service, source: e }
            }
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Request { service, source: e })?;

        Ok(UpstreamResponse {
            status,
            body,
            content_type,
        })
    }
}
