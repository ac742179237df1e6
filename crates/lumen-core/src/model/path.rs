// ── Hierarchy addressing ──
//
// Ids are only unique within their parent, so an entity is addressed by
// the chain of ids from its Zone down.

use std::fmt;

use serde::Serialize;

use super::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupPath {
    pub zone_id: EntityId,
    pub group_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LocationPath {
    pub zone_id: EntityId,
    pub group_id: EntityId,
    pub location_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DevicePath {
    pub zone_id: EntityId,
    pub group_id: EntityId,
    pub location_id: EntityId,
    pub device_id: EntityId,
}

impl GroupPath {
    pub fn new(zone_id: impl Into<EntityId>, group_id: impl Into<EntityId>) -> Self {
        Self {
            zone_id: zone_id.into(),
            group_id: group_id.into(),
        }
    }

    pub fn location(&self, location_id: impl Into<EntityId>) -> LocationPath {
        LocationPath {
            zone_id: self.zone_id.clone(),
            group_id: self.group_id.clone(),
            location_id: location_id.into(),
        }
    }
}

impl LocationPath {
    pub fn new(
        zone_id: impl Into<EntityId>,
        group_id: impl Into<EntityId>,
        location_id: impl Into<EntityId>,
    ) -> Self {
        GroupPath::new(zone_id, group_id).location(location_id)
    }

    pub fn group(&self) -> GroupPath {
        GroupPath {
            zone_id: self.zone_id.clone(),
            group_id: self.group_id.clone(),
        }
    }

    pub fn device(&self, device_id: impl Into<EntityId>) -> DevicePath {
        DevicePath {
            zone_id: self.zone_id.clone(),
            group_id: self.group_id.clone(),
            location_id: self.location_id.clone(),
            device_id: device_id.into(),
        }
    }
}

impl DevicePath {
    pub fn location(&self) -> LocationPath {
        LocationPath {
            zone_id: self.zone_id.clone(),
            group_id: self.group_id.clone(),
            location_id: self.location_id.clone(),
        }
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone_id, self.group_id)
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zone_id, self.group_id, self.location_id)
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.zone_id, self.group_id, self.location_id, self.device_id
        )
    }
}
