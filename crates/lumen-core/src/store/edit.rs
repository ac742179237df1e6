// ── Hierarchy edits ──
//
// Create/update/delete for every level plus device moves. Ids for
// locally created entities are the parent collection's highest numeric
// id plus one; Location creation goes through the backend endpoint and
// the server picks the id.

use lumen_api::models::{CreateDeviceRequest, CreateLocationRequest};
use serde_json::Value;
use tracing::info;

use super::{HierarchyStore, ensure_unique_zone_name, require_name};
use crate::error::CoreError;
use crate::model::{
    Device, DevicePath, EntityId, Group, GroupPath, Location, LocationPath, MacAddress, Zone,
};
use crate::normalize::normalize_location_value;

// ── Edit payloads ───────────────────────────────────────────────────

/// Partial update of a name/description pair. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct Rename {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewLocation {
    pub name: String,
    pub description: String,
    /// Ask the server to seed the Location with a placeholder Device, so it
    /// survives the empty-location pruning on the next load.
    pub create_default_device: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewDevice {
    pub name: String,
    pub description: String,
    pub ip: Option<String>,
    pub mac: Option<MacAddress>,
    pub hostname: Option<String>,
    pub current_color: Option<Value>,
    pub segment_colors: Vec<Value>,
}

impl NewDevice {
    fn into_device(self, device_id: EntityId) -> Device {
        Device {
            device_id,
            device_name: self.name,
            device_description: self.description,
            device_ip: self.ip,
            device_mac: self.mac,
            device_hostname: self.hostname,
            device_current_color: self.current_color,
            device_segment_colors: self.segment_colors,
            ..Device::default()
        }
    }

    pub(crate) fn to_request(&self) -> CreateDeviceRequest {
        CreateDeviceRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            hostname: self.hostname.clone(),
            ip_address: self.ip.clone(),
            mac_address: self.mac.as_ref().map(ToString::to_string),
            current_color: self.current_color.clone(),
            segment_colors: self.segment_colors.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ip: Option<String>,
    pub mac: Option<MacAddress>,
    pub hostname: Option<String>,
    pub current_color: Option<Value>,
}

/// Where a moved Device ends up.
#[derive(Debug, Clone)]
pub enum MoveTarget {
    /// An existing Location, possibly in another Group or Zone.
    Existing(LocationPath),
    /// A Location created on the spot inside `group`.
    NewLocation {
        group: GroupPath,
        name: String,
        description: String,
    },
}

fn apply_rename(rename: Rename, name: &mut String, description: &mut String) {
    if let Some(new_name) = rename.name {
        *name = new_name;
    }
    if let Some(new_description) = rename.description {
        *description = new_description;
    }
}

fn checked_rename(entity_type: &str, rename: Rename) -> Result<Rename, CoreError> {
    let name = rename
        .name
        .as_deref()
        .map(|n| require_name(entity_type, n))
        .transpose()?;
    Ok(Rename { name, ..rename })
}

fn take<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> Option<T> {
    let index = items.iter().position(matches)?;
    Some(items.remove(index))
}

impl HierarchyStore {
    // ── Zones ────────────────────────────────────────────────────────

    /// Create a Zone. Names are unique ignoring case.
    pub async fn create_zone(&self, name: &str, description: &str) -> Result<Zone, CoreError> {
        let name = require_name("Zone", name)?;
        let description = description.trim().to_owned();
        let zone = self
            .commit(|h| {
                ensure_unique_zone_name(h, &name, None)?;
                let id = EntityId::next_after(h.zones.iter().map(|z| &z.zone_id));
                let zone = Zone::new(id, name, description);
                h.zones.push(zone.clone());
                Ok(zone)
            })
            .await?;
        info!(zone_id = %zone.zone_id, name = %zone.zone_name, "zone created");
        Ok(zone)
    }

    pub async fn update_zone(&self, zone_id: &EntityId, rename: Rename) -> Result<Zone, CoreError> {
        let rename = checked_rename("Zone", rename)?;
        self.commit(|h| {
            if let Some(name) = &rename.name {
                ensure_unique_zone_name(h, name, Some(zone_id))?;
            }
            let zone = h
                .zone_mut(zone_id)
                .ok_or_else(|| CoreError::not_found("Zone", zone_id))?;
            apply_rename(rename, &mut zone.zone_name, &mut zone.zone_description);
            Ok(zone.clone())
        })
        .await
    }

    pub async fn delete_zone(&self, zone_id: &EntityId) -> Result<Zone, CoreError> {
        let zone = self
            .commit(|h| {
                take(&mut h.zones, |z| &z.zone_id == zone_id)
                    .ok_or_else(|| CoreError::not_found("Zone", zone_id))
            })
            .await?;
        info!(zone_id = %zone_id, "zone deleted");
        Ok(zone)
    }

    // ── Groups ───────────────────────────────────────────────────────

    pub async fn create_group(
        &self,
        zone_id: &EntityId,
        name: &str,
        description: &str,
    ) -> Result<Group, CoreError> {
        let name = require_name("Group", name)?;
        let description = description.trim().to_owned();
        let group = self
            .commit(|h| {
                let zone = h
                    .zone_mut(zone_id)
                    .ok_or_else(|| CoreError::not_found("Zone", zone_id))?;
                let id = EntityId::next_after(zone.groups.iter().map(|g| &g.group_id));
                let group = Group::new(id, name, description);
                zone.groups.push(group.clone());
                Ok(group)
            })
            .await?;
        info!(zone_id = %zone_id, group_id = %group.group_id, "group created");
        Ok(group)
    }

    pub async fn update_group(&self, path: &GroupPath, rename: Rename) -> Result<Group, CoreError> {
        let rename = checked_rename("Group", rename)?;
        self.commit(|h| {
            let group = h
                .group_mut(path)
                .ok_or_else(|| CoreError::not_found("Group", path))?;
            apply_rename(rename, &mut group.group_name, &mut group.group_description);
            Ok(group.clone())
        })
        .await
    }

    pub async fn delete_group(&self, path: &GroupPath) -> Result<Group, CoreError> {
        self.commit(|h| {
            let zone = h
                .zone_mut(&path.zone_id)
                .ok_or_else(|| CoreError::not_found("Zone", &path.zone_id))?;
            take(&mut zone.groups, |g| g.group_id == path.group_id)
                .ok_or_else(|| CoreError::not_found("Group", path))
        })
        .await
    }

    // ── Locations ────────────────────────────────────────────────────

    /// Create a Location through the backend's nested endpoint, then reload.
    ///
    /// Returns the Location as the server created it. Unless it was seeded
    /// with a default Device it holds no Devices, so it is pruned from the
    /// reloaded snapshot until a Device is added to it.
    pub async fn create_location(
        &self,
        group: &GroupPath,
        new: NewLocation,
    ) -> Result<Location, CoreError> {
        let name = require_name("Location", &new.name)?;
        if self.snapshot().group(group).is_none() {
            return Err(CoreError::not_found("Group", group));
        }

        let request = CreateLocationRequest {
            name,
            description: new.description.trim().to_owned(),
            create_default_device: new.create_default_device,
        };
        let created = self
            .client
            .create_location(
                &group.zone_id.to_string(),
                &group.group_id.to_string(),
                &request,
            )
            .await?;
        let location: Location = normalize_location_value(&created)
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| CoreError::Internal("location response is not an object".into()))?;
        info!(group = %group, location_id = %location.location_id, "location created");

        self.reload().await?;
        Ok(location)
    }

    pub async fn update_location(
        &self,
        path: &LocationPath,
        rename: Rename,
    ) -> Result<Location, CoreError> {
        let rename = checked_rename("Location", rename)?;
        self.commit(|h| {
            let location = h
                .location_mut(path)
                .ok_or_else(|| CoreError::not_found("Location", path))?;
            apply_rename(
                rename,
                &mut location.location_name,
                &mut location.location_description,
            );
            Ok(location.clone())
        })
        .await
    }

    pub async fn delete_location(&self, path: &LocationPath) -> Result<Location, CoreError> {
        self.commit(|h| {
            let group = h
                .group_mut(&path.group())
                .ok_or_else(|| CoreError::not_found("Group", path.group()))?;
            take(&mut group.location, |l| l.location_id == path.location_id)
                .ok_or_else(|| CoreError::not_found("Location", path))
        })
        .await
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Add a Device to a Location.
    ///
    /// Known Locations are edited locally and persisted as a whole
    /// document. A Location only the server knows about (created without
    /// Devices, hence pruned locally) goes through the nested endpoint.
    pub async fn create_device(
        &self,
        location: &LocationPath,
        new: NewDevice,
    ) -> Result<Device, CoreError> {
        let name = require_name("Device", &new.name)?;
        let new = NewDevice { name, ..new };

        let snapshot = self.snapshot();
        if snapshot.location(location).is_none() {
            if snapshot.group(&location.group()).is_none() {
                return Err(CoreError::not_found("Location", location));
            }
            return self.create_device_remote(location, &new).await;
        }

        let device = self
            .commit(|h| {
                let target = h
                    .location_mut(location)
                    .ok_or_else(|| CoreError::not_found("Location", location))?;
                let id = EntityId::next_after(target.device.iter().map(|d| &d.device_id));
                let device = new.into_device(id);
                target.device.push(device.clone());
                Ok(device)
            })
            .await?;
        info!(location = %location, device_id = %device.device_id, "device created");
        Ok(device)
    }

    async fn create_device_remote(
        &self,
        location: &LocationPath,
        new: &NewDevice,
    ) -> Result<Device, CoreError> {
        let created = self
            .client
            .create_device(
                &location.zone_id.to_string(),
                &location.group_id.to_string(),
                &location.location_id.to_string(),
                &new.to_request(),
            )
            .await?;
        let device: Device = serde_json::from_value(created)?;
        info!(location = %location, device_id = %device.device_id, "device created on server");
        self.reload().await?;
        Ok(device)
    }

    pub async fn update_device(
        &self,
        path: &DevicePath,
        update: DeviceUpdate,
    ) -> Result<Device, CoreError> {
        let name = update
            .name
            .as_deref()
            .map(|n| require_name("Device", n))
            .transpose()?;
        self.commit(|h| {
            let device = h
                .device_mut(path)
                .ok_or_else(|| CoreError::not_found("Device", path))?;
            if let Some(name) = name {
                device.device_name = name;
            }
            if let Some(description) = update.description {
                device.device_description = description;
            }
            if update.ip.is_some() {
                device.device_ip = update.ip;
            }
            if update.mac.is_some() {
                device.device_mac = update.mac;
            }
            if update.hostname.is_some() {
                device.device_hostname = update.hostname;
            }
            if update.current_color.is_some() {
                device.device_current_color = update.current_color;
            }
            Ok(device.clone())
        })
        .await
    }

    /// Remove a Device. Its Location goes too if it was the last one.
    pub async fn delete_device(&self, path: &DevicePath) -> Result<Device, CoreError> {
        let device = self
            .commit(|h| {
                let location = h
                    .location_mut(&path.location())
                    .ok_or_else(|| CoreError::not_found("Location", path.location()))?;
                take(&mut location.device, |d| d.device_id == path.device_id)
                    .ok_or_else(|| CoreError::not_found("Device", path))
            })
            .await?;
        info!(device = %path, "device deleted");
        Ok(device)
    }

    /// Move a Device to another Location and return its new address.
    ///
    /// The Device keeps its id unless the destination already uses it. A
    /// source Location left empty is pruned.
    pub async fn move_device(
        &self,
        from: &DevicePath,
        to: MoveTarget,
    ) -> Result<DevicePath, CoreError> {
        let to = match to {
            MoveTarget::Existing(path) if path == from.location() => {
                return if self.snapshot().device(from).is_some() {
                    Ok(from.clone())
                } else {
                    Err(CoreError::not_found("Device", from))
                };
            }
            MoveTarget::NewLocation {
                group,
                name,
                description,
            } => MoveTarget::NewLocation {
                group,
                name: require_name("Location", &name)?,
                description: description.trim().to_owned(),
            },
            existing @ MoveTarget::Existing(_) => existing,
        };

        let moved = self
            .commit(|h| {
                let source = h
                    .location_mut(&from.location())
                    .ok_or_else(|| CoreError::not_found("Location", from.location()))?;
                let mut device = take(&mut source.device, |d| d.device_id == from.device_id)
                    .ok_or_else(|| CoreError::not_found("Device", from))?;

                let destination = match to {
                    MoveTarget::Existing(path) => path,
                    MoveTarget::NewLocation {
                        group,
                        name,
                        description,
                    } => {
                        let parent = h
                            .group_mut(&group)
                            .ok_or_else(|| CoreError::not_found("Group", &group))?;
                        let id =
                            EntityId::next_after(parent.location.iter().map(|l| &l.location_id));
                        parent
                            .location
                            .push(Location::new(id.clone(), name, description));
                        group.location(id)
                    }
                };

                let target = h
                    .location_mut(&destination)
                    .ok_or_else(|| CoreError::not_found("Location", &destination))?;
                if target.device.iter().any(|d| d.device_id == device.device_id) {
                    device.device_id =
                        EntityId::next_after(target.device.iter().map(|d| &d.device_id));
                }
                let path = destination.device(device.device_id.clone());
                target.device.push(device);
                Ok(path)
            })
            .await?;
        info!(from = %from, to = %moved, "device moved");
        Ok(moved)
    }
}
