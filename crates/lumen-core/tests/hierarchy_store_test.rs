#![allow(clippy::unwrap_used)]
// Integration tests for `HierarchyStore` against the in-memory backend.

mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use lumen_core::{
    CoreError, EntityId, GroupPath, HierarchyStore, LocationPath, MoveTarget, NewDevice,
    NewLocation, Rename,
};
use support::{FakeBackend, Reply, aliased_house, bare_group, config};

// ── Helpers ─────────────────────────────────────────────────────────

fn store_for(backend: &Arc<FakeBackend>) -> HierarchyStore {
    let client = config().client_with_transport(backend.clone());
    HierarchyStore::new(Arc::new(client))
}

async fn loaded(document: serde_json::Value) -> (Arc<FakeBackend>, HierarchyStore) {
    let backend = FakeBackend::new(document);
    let store = store_for(&backend);
    store.reload().await.unwrap();
    backend.clear_requests();
    (backend, store)
}

// ── Loading ─────────────────────────────────────────────────────────

#[tokio::test]
async fn reload_folds_aliases_and_prunes_empty_locations() {
    let (_backend, store) = loaded(aliased_house()).await;

    let locations = store.locations(&GroupPath::new(1, 1)).unwrap();
    let names: Vec<&str> = locations.iter().map(|l| l.location_name.as_str()).collect();
    assert_eq!(names, vec!["Kitchen", "Hall"]);
    assert_eq!(locations[1].device[0].device_name, "Runner");
    assert_eq!(store.all_devices().len(), 3);
}

#[tokio::test]
async fn fetch_groups_normalizes_each_group() {
    let backend = FakeBackend::new(json!({"zones": [{
        "zone_id": 4,
        "groups": [{
            "group_id": 1,
            "group_name": "Upstairs",
            "locations": [{"location_id": 1, "devices": [{"device_id": 1, "device_name": "Lamp"}]}]
        }]
    }]}));
    let store = store_for(&backend);

    let groups = store.fetch_groups(&EntityId::from(4)).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].location[0].device[0].device_name, "Lamp");
    assert_eq!(backend.count("GET", "/api/groups"), 1);
}

#[tokio::test]
async fn subscribers_see_every_edit() {
    let (_backend, store) = loaded(bare_group()).await;
    let mut rx = store.subscribe();

    store.create_zone("Garden", "").await.unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().zones.len(), 2);
}

// ── Zones ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_zone_takes_highest_id_plus_one() {
    let (backend, store) = loaded(json!({"zones": [
        {"zone_id": 1, "zone_name": "A"},
        {"zone_id": 3, "zone_name": "B"},
        {"zone_id": 7, "zone_name": "C"}
    ]}))
    .await;

    let zone = store.create_zone("  Garage ", "detached").await.unwrap();

    assert_eq!(zone.zone_id, EntityId::from(8));
    assert_eq!(zone.zone_name, "Garage");
    assert_eq!(backend.count("PUT", "/api/hierarchy"), 1);
    let saved = backend.hierarchy();
    assert_eq!(saved["zones"][3]["zone_id"], 8);
    assert_eq!(saved["zones"][3]["zone_description"], "detached");
}

#[tokio::test]
async fn duplicate_zone_name_is_rejected_before_any_request() {
    let (backend, store) = loaded(json!({"zones": [{"zone_id": 1, "zone_name": "Garage"}]})).await;

    let err = store.create_zone("garage", "").await.unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }), "got {err:?}");
    assert!(backend.requests().is_empty());
    assert_eq!(store.zones().len(), 1);
}

#[tokio::test]
async fn blank_zone_name_is_rejected() {
    let (backend, store) = loaded(bare_group()).await;

    let err = store.create_zone("   ", "").await.unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn rename_zone_checks_other_names_only() {
    let (_backend, store) = loaded(json!({"zones": [
        {"zone_id": 1, "zone_name": "House"},
        {"zone_id": 2, "zone_name": "Garden"}
    ]}))
    .await;
    let house = EntityId::from(1);

    let renamed = store
        .update_zone(
            &house,
            Rename {
                name: Some("HOUSE".into()),
                ..Rename::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.zone_name, "HOUSE");

    let err = store
        .update_zone(
            &house,
            Rename {
                name: Some("garden".into()),
                ..Rename::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn failed_persist_keeps_local_edit() {
    let (backend, store) = loaded(bare_group()).await;
    backend.with(|s| {
        s.put_hierarchy = Some(Reply::Status(500, json!({"status": "error", "message": "disk full"})));
    });

    let err = store.create_zone("Garden", "").await.unwrap_err();

    assert!(matches!(err, CoreError::Http { status: 500, .. }), "got {err:?}");
    assert_eq!(store.zones().len(), 2);
    assert_eq!(backend.hierarchy()["zones"].as_array().map(Vec::len), Some(1));
    assert_eq!(backend.count("PUT", "/api/hierarchy"), 1);
}

// ── Persisted shape ─────────────────────────────────────────────────

#[tokio::test]
async fn persisted_document_uses_canonical_keys() {
    let (backend, store) = loaded(aliased_house()).await;

    store
        .create_group(&EntityId::from(1), "Upstairs", "")
        .await
        .unwrap();

    let saved = backend.hierarchy();
    assert!(saved.get("zone").is_none());
    let zone = &saved["zones"][0];
    assert!(zone.get("group").is_none());
    assert_eq!(zone["groups"][1]["group_id"], 2);
    assert_eq!(zone["groups"][1]["location"], json!([]));
    let ground = &zone["groups"][0];
    assert!(ground.get("locations").is_none());
    assert_eq!(ground["location"].as_array().map(Vec::len), Some(2));
    assert!(ground["location"][1].get("device_id").is_none());
    assert_eq!(ground["location"][1]["device"][0]["device_name"], "Runner");
}

// ── Locations ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_location_goes_through_endpoint_then_reloads() {
    let (backend, store) = loaded(bare_group()).await;

    let location = store
        .create_location(
            &GroupPath::new(1, 1),
            NewLocation {
                name: "Porch".into(),
                ..NewLocation::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(location.location_id, EntityId::from(1));
    assert_eq!(location.location_name, "Porch");
    assert_eq!(backend.count("POST", "/api/zones/1/groups/1/locations"), 1);
    assert_eq!(backend.count("GET", "/api/hierarchy"), 1);
    assert_eq!(backend.count("PUT", "/api/hierarchy"), 0);
    // No devices yet, so the reloaded view prunes it.
    assert!(store.locations(&GroupPath::new(1, 1)).unwrap().is_empty());
}

#[tokio::test]
async fn create_location_in_unknown_group_is_not_found() {
    let (backend, store) = loaded(bare_group()).await;

    let err = store
        .create_location(
            &GroupPath::new(1, 9),
            NewLocation {
                name: "Porch".into(),
                ..NewLocation::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound { .. }));
    assert!(backend.requests().is_empty());
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_device_in_known_location_is_local() {
    let (backend, store) = loaded(aliased_house()).await;
    let kitchen = LocationPath::new(1, 1, 1);

    let device = store
        .create_device(
            &kitchen,
            NewDevice {
                name: "Island".into(),
                ip: Some("192.168.1.30".into()),
                mac: Some("AA-BB-CC-00-11-22".parse().unwrap()),
                ..NewDevice::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(device.device_id, EntityId::from(3));
    assert_eq!(backend.count("PUT", "/api/hierarchy"), 1);
    let saved = backend.hierarchy();
    let saved_device = &saved["zones"][0]["groups"][0]["location"][0]["device"][2];
    assert_eq!(saved_device["device_name"], "Island");
    assert_eq!(saved_device["device_mac"], "aa:bb:cc:00:11:22");
}

#[tokio::test]
async fn create_device_in_server_only_location_uses_nested_endpoint() {
    let (backend, store) = loaded(bare_group()).await;
    let group = GroupPath::new(1, 1);
    let porch = store
        .create_location(
            &group,
            NewLocation {
                name: "Porch".into(),
                ..NewLocation::default()
            },
        )
        .await
        .unwrap();

    let device = store
        .create_device(
            &group.location(porch.location_id.clone()),
            NewDevice {
                name: "Porch strip".into(),
                ip: Some("192.168.1.40".into()),
                ..NewDevice::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(device.device_id, EntityId::from(1));
    assert_eq!(
        backend.count("POST", "/api/zones/1/groups/1/locations/1/devices"),
        1
    );
    let locations = store.locations(&group).unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].device[0].device_name, "Porch strip");
}

#[tokio::test]
async fn deleting_last_device_prunes_its_location() {
    let (backend, store) = loaded(aliased_house()).await;
    let hall = LocationPath::new(1, 1, 2);

    let removed = store.delete_device(&hall.device(1)).await.unwrap();

    assert_eq!(removed.device_name, "Runner");
    assert!(store.snapshot().location(&hall).is_none());
    let saved = backend.hierarchy();
    assert_eq!(
        saved["zones"][0]["groups"][0]["location"].as_array().map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn update_missing_device_is_not_found() {
    let (backend, store) = loaded(aliased_house()).await;

    let err = store
        .update_device(
            &LocationPath::new(1, 1, 1).device(99),
            lumen_core::DeviceUpdate {
                name: Some("Ghost".into()),
                ..lumen_core::DeviceUpdate::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound { .. }));
    assert!(backend.requests().is_empty());
}

// ── Moves ───────────────────────────────────────────────────────────

#[tokio::test]
async fn move_device_into_new_location() {
    let (backend, store) = loaded(aliased_house()).await;
    let counter = LocationPath::new(1, 1, 1).device(1);

    let moved = store
        .move_device(
            &counter,
            MoveTarget::NewLocation {
                group: GroupPath::new(1, 1),
                name: "Pantry".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    assert_eq!(moved, LocationPath::new(1, 1, 3).device(1));
    let snapshot = store.snapshot();
    assert_eq!(snapshot.device(&moved).unwrap().device_name, "Counter");
    assert_eq!(
        snapshot.location(&LocationPath::new(1, 1, 1)).unwrap().device.len(),
        1
    );
    assert_eq!(backend.count("PUT", "/api/hierarchy"), 1);
}

#[tokio::test]
async fn move_device_renumbers_on_id_collision_and_prunes_source() {
    let (_backend, store) = loaded(aliased_house()).await;
    let runner = LocationPath::new(1, 1, 2).device(1);

    let moved = store
        .move_device(&runner, MoveTarget::Existing(LocationPath::new(1, 1, 1)))
        .await
        .unwrap();

    assert_eq!(moved, LocationPath::new(1, 1, 1).device(3));
    let snapshot = store.snapshot();
    assert!(snapshot.location(&LocationPath::new(1, 1, 2)).is_none());
    assert_eq!(snapshot.device(&moved).unwrap().device_name, "Runner");
}

#[tokio::test]
async fn move_within_same_location_is_a_no_op() {
    let (backend, store) = loaded(aliased_house()).await;
    let counter = LocationPath::new(1, 1, 1).device(1);

    let moved = store
        .move_device(&counter, MoveTarget::Existing(counter.location()))
        .await
        .unwrap();

    assert_eq!(moved, counter);
    assert!(backend.requests().is_empty());
}
