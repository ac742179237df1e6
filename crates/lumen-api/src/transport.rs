// Transport seam between the resilient call layer and the wire.
//
// `ResilientClient` never talks to reqwest directly: it hands an
// `OutboundRequest` to a `Transport` and gets a `RawResponse` back. The
// production implementation is `HttpTransport`; tests plug in scripted
// transports to control each attempt's outcome.

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use tracing::trace;
use url::Url;

use crate::error::Error;

/// A single request as the transport sees it: one attempt, no retry logic.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

/// The undecoded response of one attempt.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    /// Whether the server declared a structured (JSON) content type.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can carry one request attempt to the backend.
///
/// Implementations report connection-level failures as
/// [`Error::NetworkUnavailable`] and never apply their own retries.
/// Non-2xx statuses are returned as a normal `RawResponse`.
pub trait Transport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<RawResponse, Error>>;
}

/// Shared transport configuration for building the reqwest client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection establishment limit. Request-level deadlines are enforced
    /// per attempt by `ResilientClient`, not here.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("lumen/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| Error::Client(format!("failed to build HTTP client: {e}")))
    }
}

/// `Transport` backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    connect_timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            connect_timeout_ms: u64::try_from(config.connect_timeout.as_millis())
                .unwrap_or(u64::MAX),
        })
    }

    /// Wrap a pre-built client (used by tests and embedders with custom TLS).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            connect_timeout_ms: 0,
        }
    }

    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, Error> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&e, self.connect_timeout_ms))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(&e, self.connect_timeout_ms))?;

        trace!(status, bytes = body.len(), "response received");
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<RawResponse, Error>> {
        self.execute(request).boxed()
    }
}
