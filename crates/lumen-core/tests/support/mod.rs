// In-memory backend for lumen-core integration tests.
//
// Implements `Transport` directly, so tests run without sockets and with
// paused time. Behaves like the real backend for the routes lumen uses:
// server-side ids are max + 1, created Locations start empty, and every
// request is recorded for assertions.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use url::Url;

use lumen_api::{Error, OutboundRequest, RawResponse, Transport};
use lumen_core::ClientConfig;

// ── Behavior knobs ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16, Value),
    /// Never answer; the caller's per-attempt timeout has to fire.
    Hang,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug)]
pub struct BackendState {
    pub hierarchy: Value,
    pub discovered: Vec<String>,
    /// Overrides the discovery route when set.
    pub discover: Option<Reply>,
    /// Probe replies by address; missing addresses answer 504.
    pub probes: HashMap<String, Reply>,
    pub device_states: HashMap<String, Value>,
    pub power: Reply,
    pub apply_saved: Reply,
    pub color: Reply,
    pub brightness: Reply,
    pub effect: Reply,
    /// Overrides the nested device-create route when set.
    pub nested_device: Option<Reply>,
    /// Overrides `PUT /api/hierarchy` when set.
    pub put_hierarchy: Option<Reply>,
    pub requests: Vec<Recorded>,
}

pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new(hierarchy: Value) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BackendState {
                hierarchy,
                discovered: Vec::new(),
                discover: None,
                probes: HashMap::new(),
                device_states: HashMap::new(),
                power: ok(),
                apply_saved: ok(),
                color: ok(),
                brightness: ok(),
                effect: ok(),
                nested_device: None,
                put_hierarchy: None,
                requests: Vec::new(),
            }),
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn hierarchy(&self) -> Value {
        self.with(|s| s.hierarchy.clone())
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.with(|s| s.requests.clone())
    }

    pub fn clear_requests(&self) {
        self.with(|s| s.requests.clear());
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.with(|s| {
            s.requests
                .iter()
                .filter(|r| r.method == method && r.path == path)
                .count()
        })
    }

    pub fn bodies(&self, method: &str, path: &str) -> Vec<Value> {
        self.with(|s| {
            s.requests
                .iter()
                .filter(|r| r.method == method && r.path == path)
                .filter_map(|r| r.body.clone())
                .collect()
        })
    }

    async fn handle(&self, request: OutboundRequest) -> Result<RawResponse, Error> {
        let reply = self.route(&request);
        match reply {
            Reply::Json(body) => Ok(respond(200, &body)),
            Reply::Status(status, body) => Ok(respond(status, &body)),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn route(&self, request: &OutboundRequest) -> Reply {
        let method = request.method.as_str().to_owned();
        let path = request.url.path().to_owned();
        let mut state = self.state.lock().unwrap();
        state.requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            body: request.body.clone(),
        });

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match (method.as_str(), segments.as_slice()) {
            ("GET", ["api", "hierarchy"]) => Reply::Json(state.hierarchy.clone()),
            ("PUT", ["api", "hierarchy"]) => {
                if let Some(reply) = state.put_hierarchy.clone() {
                    return reply;
                }
                state.hierarchy = request.body.clone().unwrap_or(Value::Null);
                ok()
            }
            ("GET", ["api", "groups"]) => {
                let zone_id = request
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "zone_id")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                let groups = find_by_id(&state.hierarchy["zones"], "zone_id", &zone_id)
                    .map(|z| z["groups"].clone())
                    .unwrap_or_else(|| json!([]));
                Reply::Json(json!({"status": "success", "groups": groups}))
            }
            ("POST", ["api", "zones", zone, "groups", group, "locations"]) => {
                let body = request.body.clone().unwrap_or_default();
                create_location(&mut state.hierarchy, zone, group, &body)
            }
            ("POST", ["api", "zones", zone, "groups", group, "locations", location, "devices"]) => {
                if let Some(reply) = state.nested_device.clone() {
                    return reply;
                }
                let body = request.body.clone().unwrap_or_default();
                create_device(&mut state.hierarchy, zone, group, location, &body)
            }
            ("POST", ["add_device"]) => Reply::Json(json!({"status": "success"})),
            ("POST", ["api", "devices", "discover"]) => {
                if let Some(reply) = state.discover.clone() {
                    return reply;
                }
                Reply::Json(json!({
                    "status": "success",
                    "discovered_devices": state.discovered,
                    "count": state.discovered.len()
                }))
            }
            ("POST", ["api", "devices", "probe"]) => {
                let ip = request
                    .body
                    .as_ref()
                    .and_then(|b| b["ip"].as_str())
                    .unwrap_or_default()
                    .to_owned();
                state.probes.get(&ip).cloned().unwrap_or_else(|| {
                    Reply::Status(
                        504,
                        json!({"status": "error", "message": "No response from device"}),
                    )
                })
            }
            ("GET", ["api", "devices", id, "state"]) => {
                let device_state = state
                    .device_states
                    .get(*id)
                    .cloned()
                    .unwrap_or_else(|| json!({"status": "offline"}));
                Reply::Json(json!({"status": "success", "state": device_state}))
            }
            ("GET", ["api", "devices", _, "ping"]) => {
                Reply::Json(json!({"status": "success", "reachable": true}))
            }
            ("POST", ["api", "devices", _, "power"]) => state.power.clone(),
            ("POST", ["api", "devices", _, "apply_saved"]) => state.apply_saved.clone(),
            ("POST", ["api", "devices", _, "color"]) => state.color.clone(),
            ("POST", ["api", "devices", _, "brightness"]) => state.brightness.clone(),
            ("POST", ["api", "devices", _, "effect"]) => state.effect.clone(),
            ("GET", ["data", "network_devices.json"]) => Reply::Json(state.hierarchy.clone()),
            _ => Reply::Status(404, json!({"status": "error", "message": "no such route"})),
        }
    }
}

impl Transport for FakeBackend {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<RawResponse, Error>> {
        self.handle(request).boxed()
    }
}

// ── Server-side helpers ─────────────────────────────────────────────

fn ok() -> Reply {
    Reply::Json(json!({"status": "success"}))
}

fn respond(status: u16, body: &Value) -> RawResponse {
    RawResponse {
        status,
        content_type: Some("application/json".into()),
        body: body.to_string(),
    }
}

fn id_matches(value: &Value, wanted: &str) -> bool {
    match value {
        Value::Number(n) => n.to_string() == wanted,
        Value::String(s) => s == wanted,
        _ => false,
    }
}

fn find_by_id<'a>(list: &'a Value, key: &str, wanted: &str) -> Option<&'a Value> {
    list.as_array()?.iter().find(|item| id_matches(&item[key], wanted))
}

fn find_by_id_mut<'a>(list: &'a mut Value, key: &str, wanted: &str) -> Option<&'a mut Value> {
    list.as_array_mut()?
        .iter_mut()
        .find(|item| id_matches(&item[key], wanted))
}

fn next_id(list: &Value, key: &str) -> u64 {
    list.as_array()
        .map(|items| items.iter().filter_map(|i| i[key].as_u64()).max().unwrap_or(0))
        .unwrap_or(0)
        + 1
}

fn not_found(what: &str) -> Reply {
    Reply::Status(404, json!({"status": "error", "message": format!("{what} not found")}))
}

fn create_location(hierarchy: &mut Value, zone: &str, group: &str, body: &Value) -> Reply {
    let Some(zone) = find_by_id_mut(&mut hierarchy["zones"], "zone_id", zone) else {
        return not_found("Zone");
    };
    let Some(group) = find_by_id_mut(&mut zone["groups"], "group_id", group) else {
        return not_found("Group");
    };
    if !group["location"].is_array() {
        group["location"] = json!([]);
    }
    let id = next_id(&group["location"], "location_id");
    let mut location = json!({
        "location_id": id,
        "location_name": body["name"],
        "location_description": body["description"],
        "device": []
    });
    if body["create_default_device"].as_bool() == Some(true) {
        location["device"] = json!([{"device_id": 1, "device_name": "Device 1"}]);
    }
    if let Some(list) = group["location"].as_array_mut() {
        list.push(location.clone());
    }
    Reply::Status(201, json!({"status": "success", "location": location}))
}

fn create_device(
    hierarchy: &mut Value,
    zone: &str,
    group: &str,
    location: &str,
    body: &Value,
) -> Reply {
    let Some(zone) = find_by_id_mut(&mut hierarchy["zones"], "zone_id", zone) else {
        return not_found("Zone");
    };
    let Some(group) = find_by_id_mut(&mut zone["groups"], "group_id", group) else {
        return not_found("Group");
    };
    let Some(location) = find_by_id_mut(&mut group["location"], "location_id", location) else {
        return not_found("Location");
    };
    if !location["device"].is_array() {
        location["device"] = json!([]);
    }
    let id = next_id(&location["device"], "device_id");
    let device = json!({
        "device_id": id,
        "device_name": body["name"],
        "device_description": body["description"],
        "device_hostname": body["hostname"],
        "device_ip": body["ip_address"],
        "device_mac": body["mac_address"],
        "device_current_color": body["current_color"],
        "device_segment_colors": body["segment_colors"]
    });
    if let Some(list) = location["device"].as_array_mut() {
        list.push(device.clone());
    }
    Reply::Json(json!({"status": "success", "device": device}))
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn config() -> ClientConfig {
    let mut config = ClientConfig::new(Url::parse("http://lumen.test/").unwrap());
    config.retry_backoff = Duration::from_millis(10);
    config.timeout = Duration::from_secs(2);
    config.poll_interval = Duration::ZERO;
    config
}

/// A document with one zone, one group and no locations.
pub fn bare_group() -> Value {
    json!({"zones": [{
        "zone_id": 1,
        "zone_name": "House",
        "zone_description": "",
        "groups": [{"group_id": 1, "group_name": "Ground floor", "group_description": "", "location": []}]
    }]})
}

/// A populated document spelled with aliases, as older backends write it.
pub fn aliased_house() -> Value {
    json!({"zone": [{
        "zone_id": 1,
        "zone_name": "House",
        "group": [{
            "group_id": 1,
            "group_name": "Ground floor",
            "locations": [
                {
                    "location_id": 1,
                    "location_name": "Kitchen",
                    "devices": [
                        {"device_id": 1, "device_name": "Counter", "device_ip": "192.168.1.20"},
                        {"device_id": 2, "device_name": "Cabinet", "device_ip": "192.168.1.21"}
                    ]
                },
                {
                    "location_id": 2,
                    "location_name": "Hall",
                    "device_id": [{"device_id": 1, "device_name": "Runner", "device_ip": "192.168.1.22"}]
                },
                {"location_id": 3, "location_name": "Unused", "device": []}
            ]
        }]
    }]})
}
