// ── Device state sync ──
//
// Keeps a per-device view of power, brightness and color. Control calls
// update the view optimistically and roll back on failure; state reads
// reconcile it with what the device reports. Color and brightness go
// through debounced senders so slider drags cost one call per window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use lumen_api::{DeviceState, RequestPolicy, ResilientClient, Rgbw};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::debounce::DebouncedSender;
use crate::error::CoreError;

/// Last-known state of one device as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceView {
    pub on: bool,
    pub brightness: Option<u8>,
    pub color: Option<Rgbw>,
    /// Device-reported status, e.g. `"offline"`.
    pub status: Option<String>,
    /// A power change is in flight; `on` is the optimistic value.
    pub pending: bool,
}

impl DeviceView {
    fn reconcile(&mut self, state: &DeviceState) {
        if !self.pending {
            self.on = state.on.unwrap_or(false);
        }
        if state.bri.is_some() {
            self.brightness = state.bri;
        }
        if let Some(color) = state.reported_color() {
            self.color = Some(color);
        }
        self.status.clone_from(&state.status);
    }
}

/// Per-device optimistic state with server reconciliation.
pub struct DeviceStateSync {
    client: Arc<ResilientClient>,
    views: Mutex<HashMap<String, Arc<watch::Sender<DeviceView>>>>,
    control_policy: RequestPolicy,
    state_policy: RequestPolicy,
    debounce_window: Duration,
}

impl DeviceStateSync {
    pub fn new(client: Arc<ResilientClient>) -> Self {
        Self {
            client,
            views: Mutex::new(HashMap::new()),
            control_policy: RequestPolicy::CONTROL,
            state_policy: RequestPolicy::STATE_FETCH,
            debounce_window: Duration::from_millis(150),
        }
    }

    pub fn with_policies(mut self, control: RequestPolicy, state: RequestPolicy) -> Self {
        self.control_policy = control;
        self.state_policy = state;
        self
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    fn sender(&self, device_id: &str) -> Arc<watch::Sender<DeviceView>> {
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = views
            .entry(device_id.to_owned())
            .or_insert_with(|| Arc::new(watch::channel(DeviceView::default()).0));
        Arc::clone(tx)
    }

    fn tracked_ids(&self) -> Vec<String> {
        let views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        views.keys().cloned().collect()
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Start tracking a device and observe its view.
    pub fn track(&self, device_id: &str) -> watch::Receiver<DeviceView> {
        self.sender(device_id).subscribe()
    }

    pub fn view(&self, device_id: &str) -> Option<DeviceView> {
        let views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        views.get(device_id).map(|tx| tx.borrow().clone())
    }

    /// Read the device-reported state and reconcile the view with it.
    ///
    /// An in-flight power change keeps its optimistic value.
    pub async fn refresh(&self, device_id: &str) -> Result<DeviceView, CoreError> {
        let state = self
            .client
            .device_state(device_id, self.state_policy)
            .await?;
        let tx = self.sender(device_id);
        tx.send_modify(|view| view.reconcile(&state));
        let view = tx.borrow().clone();
        Ok(view)
    }

    // ── Power ────────────────────────────────────────────────────────

    /// Set power, updating the view before the call returns.
    ///
    /// The view rolls back on any failure. A timeout means the device is
    /// unreachable and is reported as such. Turning on re-applies the
    /// device's saved configuration; failing that is only logged.
    pub async fn set_power(&self, device_id: &str, on: bool) -> Result<(), CoreError> {
        let tx = self.sender(device_id);
        let previous = tx.borrow().on;
        tx.send_modify(|view| {
            view.on = on;
            view.pending = true;
        });

        match self.client.set_power(device_id, on, self.control_policy).await {
            Ok(_) => {
                tx.send_modify(|view| view.pending = false);
                info!(device_id, on, "power changed");
            }
            Err(e) => {
                tx.send_modify(|view| {
                    view.on = previous;
                    view.pending = false;
                });
                warn!(device_id, error = %e, "power change failed, view reverted");
                return Err(match e {
                    lumen_api::Error::Timeout { .. } => CoreError::DeviceUnreachable {
                        device_id: device_id.to_owned(),
                    },
                    other => other.into(),
                });
            }
        }

        if on {
            if let Err(e) = self.client.apply_saved(device_id).await {
                warn!(device_id, error = %e, "re-applying saved configuration failed");
            }
        }
        Ok(())
    }

    /// Flip the current power state. Returns the new value.
    pub async fn toggle_power(&self, device_id: &str) -> Result<bool, CoreError> {
        let target = !self.sender(device_id).borrow().on;
        self.set_power(device_id, target).await?;
        Ok(target)
    }

    // ── Debounced controls ───────────────────────────────────────────

    /// Debounced color control. The device, and the view, see only the
    /// last value of each window. A failed call restores the previous
    /// color unless a newer one has replaced it meanwhile.
    pub fn color_sender(&self, device_id: &str) -> DebouncedSender<Rgbw> {
        let client = Arc::clone(&self.client);
        let tx = self.sender(device_id);
        let id = device_id.to_owned();
        let policy = self.control_policy;
        DebouncedSender::spawn(self.debounce_window, move |color: Rgbw| {
            let client = Arc::clone(&client);
            let tx = Arc::clone(&tx);
            let id = id.clone();
            let previous = tx.borrow().color;
            tx.send_modify(|view| view.color = Some(color));
            async move {
                if let Err(e) = client.set_color(&id, color, policy).await {
                    warn!(device_id = %id, error = %e, "color update failed, view reverted");
                    tx.send_if_modified(|view| revert(&mut view.color, Some(color), previous));
                }
            }
        })
    }

    /// Debounced brightness control, 0–255. Reverts like [`color_sender`](Self::color_sender).
    pub fn brightness_sender(&self, device_id: &str) -> DebouncedSender<u8> {
        let client = Arc::clone(&self.client);
        let tx = self.sender(device_id);
        let id = device_id.to_owned();
        let policy = self.control_policy;
        DebouncedSender::spawn(self.debounce_window, move |brightness: u8| {
            let client = Arc::clone(&client);
            let tx = Arc::clone(&tx);
            let id = id.clone();
            let previous = tx.borrow().brightness;
            tx.send_modify(|view| view.brightness = Some(brightness));
            async move {
                if let Err(e) = client.set_brightness(&id, brightness, policy).await {
                    warn!(device_id = %id, error = %e, "brightness update failed, view reverted");
                    tx.send_if_modified(|view| {
                        revert(&mut view.brightness, Some(brightness), previous)
                    });
                }
            }
        })
    }

    /// Run a firmware effect by id. Not debounced.
    pub async fn set_effect(&self, device_id: &str, effect_id: u32) -> Result<(), CoreError> {
        self.client
            .set_effect(device_id, effect_id, self.control_policy)
            .await?;
        debug!(device_id, effect_id, "effect applied");
        Ok(())
    }

    // ── Background polling ───────────────────────────────────────────

    /// Periodically refresh every tracked device until `cancel` fires.
    pub fn spawn_poller(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(poll_task(Arc::clone(self), interval, cancel))
    }
}

/// Put `previous` back if `slot` still holds the value that failed.
fn revert<T: PartialEq + Copy>(slot: &mut T, failed: T, previous: T) -> bool {
    if *slot != failed {
        return false;
    }
    *slot = previous;
    true
}

async fn poll_task(sync: Arc<DeviceStateSync>, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                for device_id in sync.tracked_ids() {
                    if let Err(e) = sync.refresh(&device_id).await {
                        debug!(device_id = %device_id, error = %e, "state poll failed");
                    }
                }
            }
        }
    }
}
