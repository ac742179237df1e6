// Resilient call layer
//
// Every backend interaction funnels through `ResilientClient::call`, which
// layers a per-attempt timeout, bounded retry of transient failures, and
// cooperative cancellation on top of a `Transport`. Endpoint modules
// (hierarchy, devices) are implemented as inherent methods in separate
// files to keep this module focused on call mechanics.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::{HttpTransport, OutboundRequest, RawResponse, Transport, TransportConfig};

/// Fixed pause between a transient failure and the next attempt.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(150);

// ── RequestPolicy ────────────────────────────────────────────────────

/// Timeout and retry budget for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPolicy {
    /// Per-attempt deadline. `None` (or zero) disables the timer.
    pub timeout: Option<Duration>,
    /// Additional attempts after the first, for transient failures only.
    pub retries: u32,
}

impl RequestPolicy {
    /// Device control calls: a powered-off device is expected to be
    /// unreachable, so fail fast and never retry.
    pub const CONTROL: Self = Self {
        timeout: Some(Duration::from_millis(800)),
        retries: 0,
    };

    /// Device state fetches: silence is ambiguous, so allow one retry.
    pub const STATE_FETCH: Self = Self {
        timeout: Some(Duration::from_secs(2)),
        retries: 1,
    };

    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self {
            timeout: Some(timeout),
            retries,
        }
    }
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), 1)
    }
}

// ── CallOptions ──────────────────────────────────────────────────────

/// Everything `call()` needs besides the path.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
    pub retries: u32,
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn policy(mut self, policy: RequestPolicy) -> Self {
        self.timeout = policy.timeout;
        self.retries = policy.retries;
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

// ── Payload ──────────────────────────────────────────────────────────

/// A decoded successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The server declared a JSON content type.
    Json(serde_json::Value),
    /// Anything else, returned verbatim.
    Text(String),
}

impl Payload {
    /// Interpret the payload as JSON, parsing text bodies if needed.
    ///
    /// An empty body decodes as `null`.
    pub fn into_json(self) -> Result<serde_json::Value, Error> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) if text.trim().is_empty() => Ok(serde_json::Value::Null),
            Self::Text(text) => serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text,
            }),
        }
    }
}

/// Reject 2xx bodies that carry `{"status": "error", "message": ...}`.
pub fn check_envelope(value: serde_json::Value) -> Result<serde_json::Value, Error> {
    let is_error = value
        .get("status")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("error"));
    if !is_error {
        return Ok(value);
    }
    let message = value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unspecified backend error")
        .to_owned();
    Err(Error::Api { message })
}

// ── ResilientClient ──────────────────────────────────────────────────

/// HTTP client for the lumen backend with timeout, retry, and cancellation.
///
/// Holds no mutable state across calls. Cheap to share behind an `Arc`.
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    default_policy: RequestPolicy,
    backoff: Duration,
}

impl ResilientClient {
    /// Create a client that talks HTTP to `base_url`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = HttpTransport::new(transport)?;
        Ok(Self::with_transport(base_url, Arc::new(http)))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(base_url: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url,
            default_policy: RequestPolicy::default(),
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Policy used by endpoint methods that have no dedicated one.
    pub fn with_default_policy(mut self, policy: RequestPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn default_policy(&self) -> RequestPolicy {
        self.default_policy
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve a backend path (`api/hierarchy`, `/add_device`) against the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Core call ────────────────────────────────────────────────────

    /// Perform one logical call: up to `1 + retries` attempts.
    ///
    /// Only `Timeout` and `NetworkUnavailable` are retried. The error
    /// returned after exhausting retries is the last attempt's error.
    pub async fn call(&self, path: &str, options: CallOptions) -> Result<Payload, Error> {
        let url = self.url(path)?;
        let parent = options.cancel.as_ref();

        if parent.is_some_and(CancellationToken::is_cancelled) {
            debug!(%url, "caller token already cancelled, skipping request");
            return Err(Error::Cancelled);
        }

        let attempts = options.retries.saturating_add(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(method = %options.method, %url, attempt, "sending request");

            let request = OutboundRequest {
                method: options.method.clone(),
                url: url.clone(),
                headers: options.headers.clone(),
                body: options.body.clone(),
            };

            match self.attempt(request, options.timeout, parent).await {
                Ok(raw) => return decode(raw),
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(%url, attempt, error = %err, "transient failure, retrying");
                    self.pause(parent).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run a single attempt under its own cancellation token.
    ///
    /// The attempt token is a child of the caller's token, so caller
    /// cancellation propagates into it. Dropping it at the end of the
    /// attempt detaches it from the parent.
    async fn attempt(
        &self,
        request: OutboundRequest,
        timeout: Option<Duration>,
        parent: Option<&CancellationToken>,
    ) -> Result<RawResponse, Error> {
        let token = parent.map_or_else(CancellationToken::new, CancellationToken::child_token);
        let timeout = timeout.filter(|t| !t.is_zero());

        let deadline = async {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = token.cancelled() => Err(Error::Cancelled),
            () = deadline => {
                token.cancel();
                Err(Error::Timeout { timeout_ms: millis(timeout.unwrap_or_default()) })
            }
            result = self.transport.send(request) => result,
        }
    }

    /// Back off between attempts, waking early if the caller cancels.
    async fn pause(&self, parent: Option<&CancellationToken>) -> Result<(), Error> {
        match parent {
            Some(token) => tokio::select! {
                () = token.cancelled() => Err(Error::Cancelled),
                () = tokio::time::sleep(self.backoff) => Ok(()),
            },
            None => {
                tokio::time::sleep(self.backoff).await;
                Ok(())
            }
        }
    }

    // ── Typed helpers ────────────────────────────────────────────────

    /// Call, decode JSON, check the `status` envelope, and deserialize.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, Error> {
        let value = check_envelope(self.call(path, options).await?.into_json()?)?;
        serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: value.to_string(),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        policy: RequestPolicy,
    ) -> Result<T, Error> {
        self.request(path, CallOptions::get().policy(policy)).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        policy: RequestPolicy,
    ) -> Result<T, Error> {
        let options = CallOptions::with_method(Method::POST)
            .body(encode(body)?)
            .policy(policy);
        self.request(path, options).await
    }

    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        policy: RequestPolicy,
    ) -> Result<T, Error> {
        let options = CallOptions::with_method(Method::PUT)
            .body(encode(body)?)
            .policy(policy);
        self.request(path, options).await
    }
}

fn encode(body: &impl Serialize) -> Result<serde_json::Value, Error> {
    serde_json::to_value(body).map_err(|e| Error::Encode(e.to_string()))
}

fn decode(raw: RawResponse) -> Result<Payload, Error> {
    if !raw.is_success() {
        return Err(Error::Http {
            status: raw.status,
            body: raw.body,
        });
    }
    if !raw.is_json() {
        return Ok(Payload::Text(raw.body));
    }
    if raw.body.trim().is_empty() {
        return Ok(Payload::Json(serde_json::Value::Null));
    }
    serde_json::from_str(&raw.body)
        .map(Payload::Json)
        .map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: raw.body,
        })
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
