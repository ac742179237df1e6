// Wire types for the lumen backend REST surface.
//
// Request bodies mirror the JSON the backend expects byte-for-byte. Response
// types are lenient: unknown fields are ignored or kept in a flattened map,
// and every field the firmware may omit is optional.

use serde::{Deserialize, Serialize};

// ── Hierarchy ───────────────────────────────────────────────────────

/// `GET /api/groups?zone_id=` response. Groups stay raw JSON: decoding
/// them is the hierarchy model's job.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupsResponse {
    #[serde(default)]
    pub groups: Vec<serde_json::Value>,
}

/// `POST /api/zones/{z}/groups/{g}/locations` body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub description: String,
    pub create_default_device: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocationResponse {
    pub location: serde_json::Value,
}

/// `POST /api/zones/{z}/groups/{g}/locations/{l}/devices` body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub description: String,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub current_color: Option<serde_json::Value>,
    pub segment_colors: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceResponse {
    pub device: serde_json::Value,
}

/// `POST /add_device` body (legacy flat creation endpoint).
#[derive(Debug, Clone, Serialize)]
pub struct LegacyDeviceRequest {
    pub name: String,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub hostname: Option<String>,
}

impl From<&CreateDeviceRequest> for LegacyDeviceRequest {
    fn from(req: &CreateDeviceRequest) -> Self {
        Self {
            name: req.name.clone(),
            ip_address: req.ip_address.clone(),
            mac_address: req.mac_address.clone(),
            hostname: req.hostname.clone(),
        }
    }
}

// ── Discovery ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverRequest<'a> {
    pub ip_range: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverResponse {
    #[serde(default)]
    pub discovered_devices: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeRequest<'a> {
    pub ip: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeResponse {
    pub info: ProbeInfo,
}

/// Device metadata reported by a probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, alias = "mac_address")]
    pub mac: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
}

// ── Device state & control ──────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStateResponse {
    pub state: DeviceState,
}

/// Authoritative device-reported state.
///
/// The backend answers with a minimal `{status: "offline", ...}` object
/// when the device is known but unreachable, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    #[serde(default)]
    pub on: Option<bool>,
    #[serde(default)]
    pub bri: Option<u8>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceState {
    /// Color the device reports: the firmware's first segment color when
    /// live state is present, otherwise the backend's stored
    /// `device_current_color`.
    pub fn reported_color(&self) -> Option<Rgbw> {
        let live = self
            .extra
            .get("seg")
            .and_then(|seg| seg.get(0))
            .and_then(|segment| segment.get("col"))
            .and_then(|col| col.get(0))
            .and_then(serde_json::Value::as_array)
            .and_then(|channels| Rgbw::from_channels(channels));
        live.or_else(|| {
            self.extra
                .get("device_current_color")
                .and_then(serde_json::Value::as_str)
                .and_then(Rgbw::from_hex)
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerRequest {
    pub on: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrightnessRequest {
    pub brightness: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectRequest {
    pub effect_id: u32,
}

/// RGB(W) color as sent to `POST /api/devices/{id}/color`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgbw {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u8>,
}

impl Rgbw {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, w: None }
    }

    /// Parse `#rrggbb` or `#rrggbbww`; the `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() || !matches!(digits.len(), 6 | 8) {
            return None;
        }
        let channel = |at: usize| {
            digits
                .get(at..at + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            w: if digits.len() == 8 { Some(channel(6)?) } else { None },
        })
    }

    /// Firmware channel list `[r, g, b]` or `[r, g, b, w]`.
    fn from_channels(channels: &[serde_json::Value]) -> Option<Self> {
        let channel = |index: usize| {
            channels
                .get(index)
                .and_then(serde_json::Value::as_u64)
                .and_then(|v| u8::try_from(v).ok())
        };
        Some(Self {
            r: channel(0)?,
            g: channel(1)?,
            b: channel(2)?,
            w: channel(3),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub reachable: bool,
}

/// Generic `{status: "success", ...}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn probe_info_accepts_mac_address_alias() {
        let info: ProbeInfo = serde_json::from_value(json!({
            "name": "Porch",
            "mac_address": "AABBCCDDEEFF",
            "type": "wled",
            "ver": "0.14.0"
        }))
        .unwrap();
        assert_eq!(info.mac.as_deref(), Some("AABBCCDDEEFF"));
        assert_eq!(info.device_type.as_deref(), Some("wled"));
        assert!(info.hostname.is_none());
    }

    #[test]
    fn offline_state_decodes_without_power_flag() {
        let state: DeviceState = serde_json::from_value(json!({
            "status": "offline",
            "device_ip": "10.0.0.4"
        }))
        .unwrap();
        assert_eq!(state.on, None);
        assert_eq!(state.status.as_deref(), Some("offline"));
        assert_eq!(state.extra["device_ip"], "10.0.0.4");
    }

    #[test]
    fn reported_color_prefers_live_segment() {
        let state: DeviceState = serde_json::from_value(json!({
            "on": true,
            "seg": [{"col": [[255, 160, 0, 12], [0, 0, 0]]}],
            "device_current_color": "#3dd1db"
        }))
        .unwrap();
        assert_eq!(
            state.reported_color(),
            Some(Rgbw { r: 255, g: 160, b: 0, w: Some(12) })
        );

        let stored: DeviceState = serde_json::from_value(json!({
            "status": "offline",
            "device_current_color": "#AFAB2C"
        }))
        .unwrap();
        assert_eq!(stored.reported_color(), Some(Rgbw::rgb(0xaf, 0xab, 0x2c)));
    }

    #[test]
    fn unusable_colors_are_ignored() {
        assert_eq!(Rgbw::from_hex("#12345"), None);
        assert_eq!(Rgbw::from_hex("#zz0000"), None);
        assert_eq!(Rgbw::from_hex("#ééé"), None);

        let state: DeviceState = serde_json::from_value(json!({
            "seg": [{"col": [[300, 0, 0]]}],
            "device_current_color": null
        }))
        .unwrap();
        assert_eq!(state.reported_color(), None);
    }

    #[test]
    fn color_omits_absent_white_channel() {
        let body = serde_json::to_value(Rgbw::rgb(1, 2, 3)).unwrap();
        assert_eq!(body, json!({"r": 1, "g": 2, "b": 3}));
    }
}
