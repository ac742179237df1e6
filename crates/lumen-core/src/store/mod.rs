// ── Hierarchy store ──
//
// Holds the last-known normalized hierarchy and publishes every change
// through a `watch` channel. Mutations are applied locally first (copy,
// edit, prune, swap) and then persisted as a whole document. A failed
// persist leaves the local edit in place; `reload()` resynchronizes.

mod edit;

use std::sync::Arc;

use lumen_api::ResilientClient;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{
    Device, DevicePath, EntityId, Group, GroupPath, Hierarchy, Location, LocationPath, Zone,
};
use crate::normalize::normalize_group_value;

pub use edit::{DeviceUpdate, MoveTarget, NewDevice, NewLocation, Rename};

/// Single source of truth for the client-side hierarchy.
pub struct HierarchyStore {
    client: Arc<ResilientClient>,
    state: watch::Sender<Arc<Hierarchy>>,
}

impl HierarchyStore {
    /// Create an empty store. Call [`reload()`](Self::reload) to populate it.
    pub fn new(client: Arc<ResilientClient>) -> Self {
        let (state, _) = watch::channel(Arc::new(Hierarchy::default()));
        Self { client, state }
    }

    pub fn client(&self) -> &Arc<ResilientClient> {
        &self.client
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Fetch the server document, normalize it and publish it.
    pub async fn reload(&self) -> Result<Arc<Hierarchy>, CoreError> {
        let document = self.client.get_hierarchy().await?;
        let hierarchy = Arc::new(Hierarchy::decode(&document)?);
        debug!(zones = hierarchy.zones.len(), "hierarchy loaded");
        self.state.send_replace(Arc::clone(&hierarchy));
        Ok(hierarchy)
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Current hierarchy.
    pub fn snapshot(&self) -> Arc<Hierarchy> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Hierarchy>> {
        self.state.subscribe()
    }

    /// Every published hierarchy as a `Stream`, starting with the current one.
    pub fn changes(&self) -> WatchStream<Arc<Hierarchy>> {
        WatchStream::new(self.state.subscribe())
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn zones(&self) -> Vec<Zone> {
        self.snapshot().zones.clone()
    }

    pub fn groups(&self, zone_id: &EntityId) -> Result<Vec<Group>, CoreError> {
        let snapshot = self.snapshot();
        let zone = snapshot
            .zone(zone_id)
            .ok_or_else(|| CoreError::not_found("Zone", zone_id))?;
        Ok(zone.groups.clone())
    }

    pub fn locations(&self, group: &GroupPath) -> Result<Vec<Location>, CoreError> {
        let snapshot = self.snapshot();
        let found = snapshot
            .group(group)
            .ok_or_else(|| CoreError::not_found("Group", group))?;
        Ok(found.location.clone())
    }

    pub fn devices(&self, location: &LocationPath) -> Result<Vec<Device>, CoreError> {
        let snapshot = self.snapshot();
        let found = snapshot
            .location(location)
            .ok_or_else(|| CoreError::not_found("Location", location))?;
        Ok(found.device.clone())
    }

    pub fn all_devices(&self) -> Vec<(DevicePath, Device)> {
        self.snapshot()
            .devices()
            .map(|(path, device)| (path, device.clone()))
            .collect()
    }

    pub fn find_device(&self, device_id: &EntityId) -> Option<(DevicePath, Device)> {
        self.snapshot()
            .find_device(device_id)
            .map(|(path, device)| (path, device.clone()))
    }

    /// Groups of one zone, straight from the backend.
    ///
    /// Entries are normalized like the full document; non-object entries
    /// are skipped.
    pub async fn fetch_groups(&self, zone_id: &EntityId) -> Result<Vec<Group>, CoreError> {
        let raw = self.client.list_groups(&zone_id.to_string()).await?;
        let groups = raw
            .iter()
            .filter_map(normalize_group_value)
            .map(serde_json::from_value)
            .collect::<Result<Vec<Group>, _>>()?;
        Ok(groups)
    }

    // ── Mutation plumbing ────────────────────────────────────────────

    /// Apply `op` to a copy of the current hierarchy, prune, publish,
    /// then persist the whole document.
    ///
    /// Nothing is published or sent when `op` fails.
    async fn commit<T>(
        &self,
        op: impl FnOnce(&mut Hierarchy) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut outcome = Err(CoreError::Internal("hierarchy edit did not run".into()));
        self.state.send_if_modified(|current| {
            let mut draft = Hierarchy::clone(current);
            match op(&mut draft) {
                Ok(value) => {
                    draft.prune();
                    *current = Arc::new(draft);
                    outcome = Ok(value);
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });
        let value = outcome?;
        self.persist().await?;
        Ok(value)
    }

    /// Send the current snapshot to the server (last writer wins).
    async fn persist(&self) -> Result<(), CoreError> {
        let document = self.snapshot().encode()?;
        if let Err(e) = self.client.put_hierarchy(&document).await {
            warn!(error = %e, "hierarchy persist failed, local edit kept");
            return Err(e.into());
        }
        Ok(())
    }
}

fn require_name(entity_type: &str, name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!(
            "{entity_type} name must not be empty"
        )));
    }
    Ok(trimmed.to_owned())
}

fn ensure_unique_zone_name(
    hierarchy: &Hierarchy,
    name: &str,
    except: Option<&EntityId>,
) -> Result<(), CoreError> {
    let wanted = name.to_lowercase();
    let taken = hierarchy.zones.iter().any(|zone| {
        Some(&zone.zone_id) != except && zone.zone_name.trim().to_lowercase() == wanted
    });
    if taken {
        return Err(CoreError::validation(format!(
            "a zone named '{name}' already exists"
        )));
    }
    Ok(())
}
