// ── Hierarchy domain types ──
//
// Zone → Group → Location → Device, decoded from a normalized document.
// Each level keeps fields it does not know about in `extra` so a
// load/save cycle never drops data another client wrote.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{DevicePath, EntityId, GroupPath, LocationPath, MacAddress};
use crate::normalize::normalize_document;

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Field readers that tolerate type drift: numbers and booleans read as
// their text, anything else as absent. A stray type on one field must not
// make the whole document unreadable.

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EntityId, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => EntityId::Number(n),
        other => scalar_text(other).map(EntityId::Text).unwrap_or_default(),
    })
}

fn lenient_mac<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<MacAddress>, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).map(MacAddress::new))
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

// ── Hierarchy ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    #[serde(default, deserialize_with = "nullable")]
    pub zones: Vec<Zone>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Hierarchy {
    /// Decode any parseable document, folding aliases and pruning first.
    pub fn decode(document: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(normalize_document(document))
    }

    /// Canonical document for persisting.
    pub fn encode(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self).map(|doc| normalize_document(&doc))
    }

    /// Drop every Location that no longer holds a Device.
    pub fn prune(&mut self) {
        for group in self.zones.iter_mut().flat_map(|z| z.groups.iter_mut()) {
            group.location.retain(|l| !l.device.is_empty());
        }
    }

    pub fn zone(&self, zone_id: &EntityId) -> Option<&Zone> {
        self.zones.iter().find(|z| &z.zone_id == zone_id)
    }

    pub fn zone_mut(&mut self, zone_id: &EntityId) -> Option<&mut Zone> {
        self.zones.iter_mut().find(|z| &z.zone_id == zone_id)
    }

    pub fn group(&self, path: &GroupPath) -> Option<&Group> {
        self.zone(&path.zone_id)?
            .groups
            .iter()
            .find(|g| g.group_id == path.group_id)
    }

    pub fn group_mut(&mut self, path: &GroupPath) -> Option<&mut Group> {
        self.zone_mut(&path.zone_id)?
            .groups
            .iter_mut()
            .find(|g| g.group_id == path.group_id)
    }

    pub fn location(&self, path: &LocationPath) -> Option<&Location> {
        self.group(&path.group())?
            .location
            .iter()
            .find(|l| l.location_id == path.location_id)
    }

    pub fn location_mut(&mut self, path: &LocationPath) -> Option<&mut Location> {
        self.group_mut(&path.group())?
            .location
            .iter_mut()
            .find(|l| l.location_id == path.location_id)
    }

    pub fn device(&self, path: &DevicePath) -> Option<&Device> {
        self.location(&path.location())?
            .device
            .iter()
            .find(|d| d.device_id == path.device_id)
    }

    pub fn device_mut(&mut self, path: &DevicePath) -> Option<&mut Device> {
        self.location_mut(&path.location())?
            .device
            .iter_mut()
            .find(|d| d.device_id == path.device_id)
    }

    /// Every Device in document order, with its full address.
    pub fn devices(&self) -> impl Iterator<Item = (DevicePath, &Device)> {
        self.zones.iter().flat_map(|zone| {
            zone.groups.iter().flat_map(move |group| {
                group.location.iter().flat_map(move |location| {
                    location.device.iter().map(move |device| {
                        let path = LocationPath::new(
                            zone.zone_id.clone(),
                            group.group_id.clone(),
                            location.location_id.clone(),
                        )
                        .device(device.device_id.clone());
                        (path, device)
                    })
                })
            })
        })
    }

    /// First Device with this id anywhere in the tree.
    pub fn find_device(&self, device_id: &EntityId) -> Option<(DevicePath, &Device)> {
        self.devices().find(|(_, d)| &d.device_id == device_id)
    }
}

// ── Zone ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default, deserialize_with = "lenient_id")]
    pub zone_id: EntityId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zone_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zone_description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub groups: Vec<Group>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Zone {
    pub fn new(zone_id: EntityId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            zone_id,
            zone_name: name.into(),
            zone_description: description.into(),
            ..Self::default()
        }
    }
}

// ── Group ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, deserialize_with = "lenient_id")]
    pub group_id: EntityId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub group_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub group_description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Vec<Location>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    pub fn new(group_id: EntityId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            group_id,
            group_name: name.into(),
            group_description: description.into(),
            ..Self::default()
        }
    }
}

// ── Location ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient_id")]
    pub location_id: EntityId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location_description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub device: Vec<Device>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    pub fn new(
        location_id: EntityId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            location_id,
            location_name: name.into(),
            location_description: description.into(),
            ..Self::default()
        }
    }
}

// ── Device ──────────────────────────────────────────────────────────

/// A network-reachable lighting controller.
///
/// Identity is `device_id` within its Location; the IP/MAC pair is how the
/// backend reaches it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default, deserialize_with = "lenient_id")]
    pub device_id: EntityId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_description: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub device_ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_mac")]
    pub device_mac: Option<MacAddress>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub device_hostname: Option<String>,
    #[serde(default)]
    pub device_current_color: Option<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub device_segment_colors: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
