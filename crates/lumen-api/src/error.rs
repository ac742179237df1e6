use thiserror::Error;

/// Top-level error type for the `lumen-api` crate.
///
/// Every outbound call resolves to exactly one of these. The split between
/// [`Timeout`](Error::Timeout), [`NetworkUnavailable`](Error::NetworkUnavailable)
/// and [`Http`](Error::Http) drives the retry policy: only the first two are
/// retried. `lumen-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Cancellation ────────────────────────────────────────────────
    /// The caller's cancellation token fired, either before the first
    /// attempt or while a request was in flight.
    #[error("Request cancelled")]
    Cancelled,

    // ── Transport ───────────────────────────────────────────────────
    /// The per-attempt timer fired before a response arrived.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The backend could not be reached at all (DNS, refused connection, reset).
    #[error("Network unavailable: {reason}")]
    NetworkUnavailable { reason: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A request body could not be encoded as JSON.
    #[error("Request body encoding failed: {0}")]
    Encode(String),

    /// Building the underlying HTTP client failed.
    #[error("HTTP client error: {0}")]
    Client(String),

    // ── Envelope ────────────────────────────────────────────────────
    /// A 2xx response whose body carried `{"status": "error", "message": ...}`.
    #[error("Backend reported an error: {message}")]
    Api { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// `Http` never qualifies: the server was reached and rejected the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NetworkUnavailable { .. })
    }

    /// Returns `true` if the caller's token cancelled the call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Classify a `reqwest` failure that happened before any status was read.
    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else {
            Self::NetworkUnavailable {
                reason: err.to_string(),
            }
        }
    }
}
