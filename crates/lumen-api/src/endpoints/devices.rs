// Device discovery, probing, and control endpoints
//
// Control calls take an explicit `RequestPolicy` because their timeout
// semantics differ from the client default (fail fast for power, one
// retry for state reads).

use reqwest::Method;
use tracing::debug;

use super::component;
use crate::client::{CallOptions, RequestPolicy, ResilientClient};
use crate::error::Error;
use crate::models::{
    Ack, BrightnessRequest, DeviceState, DeviceStateResponse, DiscoverRequest, DiscoverResponse,
    EffectRequest, PingResponse, PowerRequest, ProbeInfo, ProbeRequest, ProbeResponse, Rgbw,
};

fn device_path(device_id: &str, action: &str) -> String {
    format!("api/devices/{}/{action}", component(device_id))
}

impl ResilientClient {
    // ── Discovery ────────────────────────────────────────────────────

    /// Ask the backend to scan a subnet prefix. One call per scan.
    ///
    /// `POST /api/devices/discover` with `{"ip_range": "192.168.1"}`
    pub async fn discover(
        &self,
        ip_range: &str,
        policy: RequestPolicy,
    ) -> Result<Vec<String>, Error> {
        debug!(ip_range, "requesting subnet discovery");
        let resp: DiscoverResponse = self
            .post_json("api/devices/discover", &DiscoverRequest { ip_range }, policy)
            .await?;
        Ok(resp.discovered_devices)
    }

    /// Probe a single address for device metadata.
    ///
    /// `POST /api/devices/probe` with `{"ip": "..."}`
    pub async fn probe(&self, ip: &str, policy: RequestPolicy) -> Result<ProbeInfo, Error> {
        debug!(ip, "probing device");
        let resp: ProbeResponse = self
            .post_json("api/devices/probe", &ProbeRequest { ip }, policy)
            .await?;
        Ok(resp.info)
    }

    // ── State ────────────────────────────────────────────────────────

    /// `GET /api/devices/{id}/state`
    pub async fn device_state(
        &self,
        device_id: &str,
        policy: RequestPolicy,
    ) -> Result<DeviceState, Error> {
        let resp: DeviceStateResponse = self
            .get_json(&device_path(device_id, "state"), policy)
            .await?;
        Ok(resp.state)
    }

    /// `GET /api/devices/{id}/ping`
    pub async fn ping_device(&self, device_id: &str) -> Result<bool, Error> {
        let resp: PingResponse = self
            .get_json(&device_path(device_id, "ping"), self.default_policy())
            .await?;
        Ok(resp.reachable)
    }

    // ── Control ──────────────────────────────────────────────────────

    /// `POST /api/devices/{id}/power` with `{"on": bool}`
    pub async fn set_power(
        &self,
        device_id: &str,
        on: bool,
        policy: RequestPolicy,
    ) -> Result<Ack, Error> {
        debug!(device_id, on, "setting power");
        self.post_json(&device_path(device_id, "power"), &PowerRequest { on }, policy)
            .await
    }

    /// Re-apply the device's last persisted configuration.
    ///
    /// `POST /api/devices/{id}/apply_saved`
    pub async fn apply_saved(&self, device_id: &str) -> Result<Ack, Error> {
        debug!(device_id, "re-applying saved configuration");
        let options = CallOptions::with_method(Method::POST).policy(self.default_policy());
        self.request(&device_path(device_id, "apply_saved"), options)
            .await
    }

    /// `POST /api/devices/{id}/color` with `{"r", "g", "b"[, "w"]}`
    pub async fn set_color(
        &self,
        device_id: &str,
        color: Rgbw,
        policy: RequestPolicy,
    ) -> Result<Ack, Error> {
        self.post_json(&device_path(device_id, "color"), &color, policy)
            .await
    }

    /// `POST /api/devices/{id}/brightness` with `{"brightness": 0..=255}`
    pub async fn set_brightness(
        &self,
        device_id: &str,
        brightness: u8,
        policy: RequestPolicy,
    ) -> Result<Ack, Error> {
        self.post_json(
            &device_path(device_id, "brightness"),
            &BrightnessRequest { brightness },
            policy,
        )
        .await
    }

    /// `POST /api/devices/{id}/effect` with `{"effect_id": n}`
    pub async fn set_effect(
        &self,
        device_id: &str,
        effect_id: u32,
        policy: RequestPolicy,
    ) -> Result<Ack, Error> {
        self.post_json(
            &device_path(device_id, "effect"),
            &EffectRequest { effect_id },
            policy,
        )
        .await
    }

    // ── Feature gate ─────────────────────────────────────────────────

    /// Whether the backend serves its device data file.
    ///
    /// `GET /data/network_devices.json`. Presence gates device-dependent
    /// features; an HTTP rejection means "absent", transport failures propagate.
    pub async fn network_devices_available(&self) -> Result<bool, Error> {
        let policy = RequestPolicy {
            retries: 0,
            ..self.default_policy()
        };
        match self
            .call("data/network_devices.json", CallOptions::get().policy(policy))
            .await
        {
            Ok(_) => Ok(true),
            Err(Error::Http { status, .. }) => {
                debug!(status, "device data file unavailable");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
