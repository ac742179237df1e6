// ── Session ──
//
// Wires one resilient client to the hierarchy store, the discovery
// coordinator and device-state sync, and owns the background poller.

use std::future::Future;
use std::sync::Arc;

use lumen_api::{ResilientClient, Transport};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::device_sync::DeviceStateSync;
use crate::discovery::DiscoveryCoordinator;
use crate::error::CoreError;
use crate::store::HierarchyStore;

/// Entry point for consumers.
///
/// Cheaply cloneable. Nothing talks to the backend until
/// [`connect()`](Self::connect) or an explicit store/device call.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: ClientConfig,
    client: Arc<ResilientClient>,
    store: Arc<HierarchyStore>,
    discovery: DiscoveryCoordinator,
    devices: Arc<DeviceStateSync>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Build a session over the real HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let client = config.build_client()?;
        Ok(Self::from_client(config, client))
    }

    /// Build a session over any transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let client = config.client_with_transport(transport);
        Self::from_client(config, client)
    }

    fn from_client(config: ClientConfig, client: ResilientClient) -> Self {
        let client = Arc::new(client);
        let store = Arc::new(HierarchyStore::new(Arc::clone(&client)));
        let discovery = DiscoveryCoordinator::new(Arc::clone(&client), Arc::clone(&store))
            .with_probe_policy(config.state_policy());
        let devices = Arc::new(
            DeviceStateSync::new(Arc::clone(&client))
                .with_policies(config.control_policy(), config.state_policy())
                .with_debounce_window(config.debounce_window),
        );

        Self {
            inner: Arc::new(SessionInner {
                config,
                client,
                store,
                discovery,
                devices,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &Arc<ResilientClient> {
        &self.inner.client
    }

    pub fn store(&self) -> &Arc<HierarchyStore> {
        &self.inner.store
    }

    pub fn discovery(&self) -> &DiscoveryCoordinator {
        &self.inner.discovery
    }

    pub fn devices(&self) -> &Arc<DeviceStateSync> {
        &self.inner.devices
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load the hierarchy and start background polling (if configured).
    pub async fn connect(&self) -> Result<(), CoreError> {
        let hierarchy = self.inner.store.reload().await?;
        info!(
            url = %self.inner.config.base_url,
            zones = hierarchy.zones.len(),
            "session connected"
        );

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let handle = self
                .inner
                .devices
                .spawn_poller(interval, self.inner.cancel.child_token());
            self.inner.task_handles.lock().await.push(handle);
        }
        Ok(())
    }

    /// Stop background tasks and wait for them to exit.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                debug!(error = %e, "background task ended abnormally");
            }
        }
    }

    /// Run one operation against a freshly loaded session, without polling.
    pub async fn oneshot<F, Fut, T>(config: ClientConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut config = config;
        config.poll_interval = std::time::Duration::ZERO;
        let session = Session::new(config)?;
        session.connect().await?;
        let result = f(session.clone()).await;
        session.disconnect().await;
        result
    }

    // ── Backend checks ───────────────────────────────────────────────

    /// Whether the backend's device data is available. Device-dependent
    /// features are disabled when it is not.
    pub async fn devices_available(&self) -> Result<bool, CoreError> {
        Ok(self.inner.client.network_devices_available().await?)
    }

    /// Ask the backend whether a device answers.
    pub async fn ping(&self, device_id: &str) -> Result<bool, CoreError> {
        Ok(self.inner.client.ping_device(device_id).await?)
    }
}
