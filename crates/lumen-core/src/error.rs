// ── Core error types ──
//
// User-facing errors from lumen-core. The `From<lumen_api::Error>` impl
// keeps the transport classification (timeout vs. unreachable vs. HTTP)
// so callers can show "device offline" instead of a generic failure.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Operation not allowed while {state}")]
    InvalidState { state: String },

    // ── Connectivity errors ──────────────────────────────────────────
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Backend unreachable: {reason}")]
    NetworkUnavailable { reason: String },

    /// A control call timed out. The device is most likely powered off
    /// at the mains or off the network.
    #[error("Device {device_id} is unreachable")]
    DeviceUnreachable { device_id: String },

    #[error("Operation cancelled")]
    Cancelled,

    // ── Backend errors ───────────────────────────────────────────────
    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Backend rejected the request: {message}")]
    Rejected { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_owned(),
            identifier: identifier.to_string(),
        }
    }

    /// Failures that mean "could not talk to it" rather than "it said no".
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::NetworkUnavailable { .. } | Self::DeviceUnreachable { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lumen_api::Error> for CoreError {
    fn from(err: lumen_api::Error) -> Self {
        match err {
            lumen_api::Error::Cancelled => CoreError::Cancelled,
            lumen_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            lumen_api::Error::NetworkUnavailable { reason } => {
                CoreError::NetworkUnavailable { reason }
            }
            lumen_api::Error::Http { status, body } => CoreError::Http { status, body },
            lumen_api::Error::Api { message } => CoreError::Rejected { message },
            lumen_api::Error::InvalidUrl(e) => CoreError::Internal(format!("Invalid URL: {e}")),
            lumen_api::Error::Encode(message) | lumen_api::Error::Client(message) => {
                CoreError::Internal(message)
            }
            lumen_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(format!("Hierarchy document error: {err}"))
    }
}
