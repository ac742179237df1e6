// ── Hierarchy document normalization ──
//
// Documents from the backend spell child collections several ways
// (`zone`/`zones`, `group`/`groups`, `location`/`locations`,
// `device`/`devices`/`device_id`). Everything past this module sees one
// spelling per level:
//
//   root.zones → zone.groups → group.location → location.device
//
// Normalization is total and idempotent. It never fails on a parseable
// document: junk where a collection belongs becomes an empty collection,
// and non-object entries inside collections are dropped.

use serde_json::{Map, Value};

// ── Key tables ──────────────────────────────────────────────────────

pub const ZONES: &str = "zones";
pub const GROUPS: &str = "groups";
pub const LOCATIONS: &str = "location";
pub const DEVICES: &str = "device";

pub const ZONE_ALIASES: &[&str] = &["zone"];
pub const GROUP_ALIASES: &[&str] = &["group"];
pub const LOCATION_ALIASES: &[&str] = &["locations"];
pub const DEVICE_ALIASES: &[&str] = &["devices", "device_id"];

const MAC_KEY: &str = "device_mac";

// ── Public entry points ─────────────────────────────────────────────

/// Normalize a full hierarchy document.
///
/// A bare array is accepted as the zone list; any other non-object root
/// yields an empty hierarchy.
pub fn normalize_document(document: &Value) -> Value {
    let mut root = match document {
        Value::Object(map) => map.clone(),
        Value::Array(zones) => {
            let mut map = Map::new();
            map.insert(ZONES.into(), Value::Array(zones.clone()));
            map
        }
        _ => Map::new(),
    };

    let zones = fold_alias(&mut root, ZONES, ZONE_ALIASES)
        .into_iter()
        .filter_map(into_object)
        .map(|zone| Value::Object(normalize_zone(zone)))
        .collect();
    root.insert(ZONES.into(), Value::Array(zones));
    Value::Object(root)
}

/// Normalize one Group (as returned by `GET /api/groups`).
///
/// Returns `None` when the value is not an object.
pub fn normalize_group_value(group: &Value) -> Option<Value> {
    into_object(group.clone()).map(|g| Value::Object(normalize_group(g)))
}

/// Normalize one Location (as returned by the location-create endpoint).
///
/// Single Locations are not pruned: an empty device list is kept as-is.
pub fn normalize_location_value(location: &Value) -> Option<Value> {
    into_object(location.clone()).map(|l| Value::Object(normalize_location(l)))
}

/// Flatten a child collection that may be spelled `canonical` or any of
/// `aliases`, in that order of preference.
///
/// Read-only counterpart of the folding rule: the first non-empty spelling
/// wins, a lone object counts as a one-element collection, and anything
/// else yields an empty sequence.
pub fn flatten_collection<'a>(
    parent: &'a Value,
    canonical: &str,
    aliases: &[&str],
) -> Vec<&'a Value> {
    let Some(map) = parent.as_object() else {
        return Vec::new();
    };
    std::iter::once(canonical)
        .chain(aliases.iter().copied())
        .filter_map(|key| map.get(key))
        .map(collection_refs)
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}

// ── Per-level normalization ─────────────────────────────────────────

fn normalize_zone(mut zone: Map<String, Value>) -> Map<String, Value> {
    let groups = fold_alias(&mut zone, GROUPS, GROUP_ALIASES)
        .into_iter()
        .filter_map(into_object)
        .map(|group| Value::Object(normalize_group(group)))
        .collect();
    zone.insert(GROUPS.into(), Value::Array(groups));
    zone
}

fn normalize_group(mut group: Map<String, Value>) -> Map<String, Value> {
    let locations = fold_alias(&mut group, LOCATIONS, LOCATION_ALIASES)
        .into_iter()
        .filter_map(into_object)
        .map(normalize_location)
        .filter(has_devices)
        .map(Value::Object)
        .collect();
    group.insert(LOCATIONS.into(), Value::Array(locations));
    group
}

fn normalize_location(mut location: Map<String, Value>) -> Map<String, Value> {
    // A scalar `device_id` on a Location is an ordinary field, not an alias.
    let scalar_device_id = location
        .get("device_id")
        .filter(|v| !v.is_array() && !v.is_object())
        .cloned();

    let devices = fold_alias(&mut location, DEVICES, DEVICE_ALIASES)
        .into_iter()
        .filter_map(into_object)
        .map(|device| Value::Object(normalize_device(device)))
        .collect();
    location.insert(DEVICES.into(), Value::Array(devices));

    if let Some(value) = scalar_device_id {
        location.insert("device_id".into(), value);
    }
    location
}

fn normalize_device(mut device: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::String(mac)) = device.get(MAC_KEY) {
        let canonical = crate::model::MacAddress::new(mac).to_string();
        device.insert(MAC_KEY.into(), Value::String(canonical));
    }
    device
}

fn has_devices(location: &Map<String, Value>) -> bool {
    location
        .get(DEVICES)
        .and_then(Value::as_array)
        .is_some_and(|devices| !devices.is_empty())
}

// ── Folding ─────────────────────────────────────────────────────────

/// Remove `canonical` and every alias from `map`, returning the collection
/// that should live under `canonical`.
///
/// The canonical spelling wins when it holds data; otherwise the first
/// alias with data does. Alias keys never survive, so a normalized
/// document carries exactly one spelling per level.
fn fold_alias(map: &mut Map<String, Value>, canonical: &str, aliases: &[&str]) -> Vec<Value> {
    let mut chosen = map
        .remove(canonical)
        .map(into_collection)
        .unwrap_or_default();
    for alias in aliases {
        let Some(value) = map.remove(*alias) else {
            continue;
        };
        if chosen.is_empty() {
            chosen = into_collection(value);
        }
    }
    chosen
}

fn into_collection(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

fn collection_refs(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

fn into_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
