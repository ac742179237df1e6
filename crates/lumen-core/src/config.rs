// ── Runtime client configuration ──
//
// Describes how to reach the backend and how patient to be with it.
// Never touches disk: the CLI resolves profiles and hands one of these in.

use std::sync::Arc;
use std::time::Duration;

use lumen_api::{HttpTransport, RequestPolicy, ResilientClient, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// Configuration for one backend connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g. `http://192.168.1.10:5000`).
    pub base_url: Url,
    /// Per-attempt deadline for ordinary calls.
    pub timeout: Duration,
    /// Extra attempts after a transient failure.
    pub retries: u32,
    /// Pause between attempts.
    pub retry_backoff: Duration,
    /// Deadline for device control calls (never retried).
    pub control_timeout: Duration,
    /// Deadline for device state reads.
    pub state_timeout: Duration,
    pub state_retries: u32,
    /// Coalescing window for high-frequency controls (color, brightness).
    pub debounce_window: Duration,
    /// Interval for background state polling. Zero disables it.
    pub poll_interval: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(10),
            retries: 1,
            retry_backoff: lumen_api::DEFAULT_BACKOFF,
            control_timeout: RequestPolicy::CONTROL.timeout.unwrap_or(Duration::ZERO),
            state_timeout: RequestPolicy::STATE_FETCH.timeout.unwrap_or(Duration::ZERO),
            state_retries: RequestPolicy::STATE_FETCH.retries,
            debounce_window: Duration::from_millis(150),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn default_policy(&self) -> RequestPolicy {
        RequestPolicy::new(self.timeout, self.retries)
    }

    pub fn control_policy(&self) -> RequestPolicy {
        RequestPolicy::new(self.control_timeout, 0)
    }

    pub fn state_policy(&self) -> RequestPolicy {
        RequestPolicy::new(self.state_timeout, self.state_retries)
    }

    /// Build the resilient client over the real HTTP transport.
    pub fn build_client(&self) -> Result<ResilientClient, CoreError> {
        let transport = HttpTransport::new(&TransportConfig::default())?;
        Ok(self.client_with_transport(Arc::new(transport)))
    }

    /// Build the resilient client over any transport.
    pub fn client_with_transport(
        &self,
        transport: Arc<dyn lumen_api::Transport>,
    ) -> ResilientClient {
        ResilientClient::with_transport(self.base_url.clone(), transport)
            .with_default_policy(self.default_policy())
            .with_backoff(self.retry_backoff)
    }
}
